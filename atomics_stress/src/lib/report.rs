// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Printing check results.

use console::style;

use crate::{CheckReport, StressError};

fn format_throughput(operations_per_second: f64) -> String {
    if operations_per_second >= 1e6 {
        format!("{:.1} Mops/s", operations_per_second / 1e6)
    } else if operations_per_second >= 1e3 {
        format!("{:.1} Kops/s", operations_per_second / 1e3)
    } else {
        format!("{operations_per_second:.0} ops/s")
    }
}

pub fn print_report(report: &CheckReport, verbose: bool) {
    let status = if report.interrupted {
        style("STOP").yellow().bold()
    } else {
        style("PASS").green().bold()
    };
    println!(
        "{status} {:<16} {} ops in {:.2?} ({})",
        report.name,
        report.operations,
        report.elapsed,
        format_throughput(report.throughput()),
    );
    if verbose {
        println!("     {}", style(format!("{} threads", report.threads)).dim());
    }
}

pub fn print_failure(name: &str, error: &StressError) {
    eprintln!("{} {name:<16} {error}", style("FAIL").red().bold());
}

#[test]
fn test_format_throughput() {
    assert_eq!(format_throughput(2_500_000.0), "2.5 Mops/s");
    assert_eq!(format_throughput(12_340.0), "12.3 Kops/s");
    assert_eq!(format_throughput(12.0), "12 ops/s");
}
