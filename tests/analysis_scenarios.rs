// End-to-end: CSV ledger → window filter → matcher → summary lines

use chrono::NaiveDate;
use donation_trace::{
    filter_deposits_and_withdrawals, load_csv, match_transactions, AnalysisWindow, CsvLedgerLoader,
    LoadError, MatchReport, MatchingEngine,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write_ledger(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

fn analyze(rows: &[&str], start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let file = write_ledger(rows);
    let transactions = load_csv(file.path()).unwrap();
    let window = AnalysisWindow::new(start, end).unwrap();

    let split = filter_deposits_and_withdrawals(&transactions, &window);
    match_transactions(&split.deposits, &split.withdrawals, window.end_date)
}

#[test]
fn single_pair_produces_one_summary() {
    let lines = analyze(
        &["2019-07-05,A,500,Deposited", "2019-07-10,B,500,Withdrew"],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert_eq!(
        lines,
        vec!["A deposited Rs. 500 on 2019-07-05. and B withdrew Rs.500 on 2019-07-10. So this could mean that B got 500 donation."]
    );
}

#[test]
fn duplicate_rows_collapse_with_doubled_amount() {
    let lines = analyze(
        &[
            "2019-07-05,A,500,Deposited",
            "2019-07-10,B,500,Withdrew",
            "2019-07-10,B,500,Withdrew",
        ],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert_eq!(
        lines,
        vec!["A deposited Rs. 1000 on 2019-07-05. and B withdrew Rs.1000 on 2019-07-10. So this could mean that B got 1000 donation."]
    );
}

#[test]
fn different_amounts_never_match() {
    let lines = analyze(
        &["2019-07-05,A,500,Deposited", "2019-07-10,B,501,Withdrew"],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert!(lines.is_empty());
}

#[test]
fn withdrawal_sixteen_days_after_end_is_excluded() {
    let lines = analyze(
        &["2019-07-20,A,500,Deposited", "2019-07-26,B,500,Withdrew"],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert!(lines.is_empty());
}

#[test]
fn withdrawal_fifteen_days_after_end_is_included() {
    let lines = analyze(
        &["2019-07-20,A,500,Deposited", "2019-07-25,B,500,Withdrew"],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert_eq!(lines.len(), 1);
}

#[test]
fn deposit_before_start_is_not_a_source() {
    let lines = analyze(
        &["2019-07-04,A,500,Deposited", "2019-07-06,B,500,Withdrew"],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert!(lines.is_empty());
}

#[test]
fn thousands_separators_match_plain_amounts() {
    let lines = analyze(
        &["2019-07-05,A,\"1,500\",Deposited", "2019-07-09,B,1500,Withdrew"],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("Rs. 1500 on 2019-07-05"));
}

#[test]
fn earliest_deposit_wins_and_rows_are_ordered_by_withdrawal() {
    let lines = analyze(
        &[
            "2019-07-08,A,200,Deposited",
            "2019-07-06,A,200,Deposited",
            "2019-07-07,C,300,Deposited",
            "2019-07-12,D,300,Withdrew",
            "2019-07-10,B,200,Withdrew",
        ],
        ymd(2019, 7, 5),
        ymd(2019, 7, 10),
    );

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("C deposited Rs. 300 on 2019-07-07. and D withdrew"));
    assert!(lines[1].starts_with("A deposited Rs. 200 on 2019-07-06. and B withdrew"));
}

#[test]
fn repeated_runs_are_identical() {
    let rows = [
        "2019-07-05,A,100,Deposited",
        "2019-07-06,B,100,Deposited",
        "2019-07-07,X,100,Withdrew",
        "2019-07-08,Y,100,Withdrew",
        "2019-07-08,Y,100,Withdrew",
    ];

    let first = analyze(&rows, ymd(2019, 7, 5), ymd(2019, 7, 10));
    let second = analyze(&rows, ymd(2019, 7, 5), ymd(2019, 7, 10));

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn unknown_type_rejects_the_ledger() {
    let file = write_ledger(&["2019-07-05,A,500,Deposited", "2019-07-06,B,500,withdrew"]);
    let err = load_csv(file.path()).unwrap_err();

    assert!(matches!(err, LoadError::UnknownTransactionType { line: 2, .. }));
}

#[test]
fn report_matches_plain_pipeline() {
    let file = write_ledger(&[
        "2019-07-05,A,500,Deposited",
        "2019-07-10,B,500,Withdrew",
        "2019-07-10,B,500,Withdrew",
        "2019-07-06,C,75,Deposited",
        "2019-07-12,D,75,Withdrew",
    ]);
    let transactions = CsvLedgerLoader::new().load_path(file.path()).unwrap();
    let window = AnalysisWindow::new(ymd(2019, 7, 5), ymd(2019, 7, 10)).unwrap();

    let report = MatchReport::build(&transactions, &window, &MatchingEngine::new());
    let split = filter_deposits_and_withdrawals(&transactions, &window);

    assert_eq!(
        report.summary_lines(),
        match_transactions(&split.deposits, &split.withdrawals, window.end_date)
    );
    assert_eq!(report.total_flagged, 1075.0);
}

#[test]
fn start_after_end_scans_from_start_to_extended_end() {
    let lines = analyze(
        &[
            "2019-07-11,X,500,Deposited",
            "2019-07-12,A,500,Deposited",
            "2019-07-20,B,500,Withdrew",
        ],
        ymd(2019, 7, 12),
        ymd(2019, 7, 10),
    );

    assert_eq!(
        lines,
        vec!["A deposited Rs. 500 on 2019-07-12. and B withdrew Rs.500 on 2019-07-20. So this could mean that B got 500 donation."]
    );
}
