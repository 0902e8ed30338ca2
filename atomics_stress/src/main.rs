// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use atomics_stress::{
    BITOPS_MAX_THREADS, CheckReport, MAX_THREADS, StressConfig, StressError, add_check,
    bitops_check, cas_race_check, default_threads, message_passing_check, print_failure,
    print_report, request_stop,
};
use clap::{Parser as ClapParser, Subcommand};
use console::style;

/// Torture tests for the arm_atomics primitives
#[derive(Debug, ClapParser)] // requires `derive` feature
#[command(name = "atomics_stress")]
#[command(about = "Torture tests for the arm_atomics primitives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the configuration and per-check details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks that concurrent add, inc and dec lose no updates
    Add {
        #[arg(short, long, default_value_t = default_threads().min(MAX_THREADS), value_parser = thread_count)]
        threads: usize,
        /// Iterations per thread
        #[arg(short, long, default_value_t = 100_000)]
        iterations: u64,
    },

    /// Checks that exactly one racing compare-and-swap wins each round
    CasRace {
        #[arg(short, long, default_value_t = default_threads().min(MAX_THREADS), value_parser = thread_count)]
        threads: usize,
        #[arg(short, long, default_value_t = 10_000, value_parser = clap::value_parser!(i32).range(1..))]
        rounds: i32,
    },

    /// Checks that release stores publish data to acquire loads
    MessagePassing {
        #[arg(short, long, default_value_t = 100_000, value_parser = clap::value_parser!(i32).range(1..))]
        rounds: i32,
    },

    /// Checks that and, or and xor never disturb other threads' bits
    Bitops {
        #[arg(short, long, default_value_t = default_threads().min(BITOPS_MAX_THREADS), value_parser = bitops_thread_count)]
        threads: usize,
        /// Iterations per thread
        #[arg(short, long, default_value_t = 100_000)]
        iterations: u64,
    },

    /// Runs every check with its defaults
    All {
        /// Worker threads; the bitops check uses at most 31 of them
        #[arg(short, long, default_value_t = default_threads().min(MAX_THREADS), value_parser = thread_count)]
        threads: usize,
    },
}

fn parse_threads(arg: &str, max: usize) -> Result<usize, String> {
    let threads: usize = arg.parse().map_err(|err| format!("{err}"))?;
    if !(1..=max).contains(&threads) {
        return Err(format!("must be between 1 and {max}"));
    }
    Ok(threads)
}

fn thread_count(arg: &str) -> Result<usize, String> {
    parse_threads(arg, MAX_THREADS)
}

fn bitops_thread_count(arg: &str) -> Result<usize, String> {
    parse_threads(arg, BITOPS_MAX_THREADS)
}

type Check = fn(&StressConfig) -> Result<CheckReport, StressError>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    ctrlc::set_handler(request_stop)?;

    let defaults = StressConfig::default();
    let plan: Vec<(&str, Check, StressConfig)> = match args.command {
        Command::Add {
            threads,
            iterations,
        } => vec![(
            "add",
            add_check as Check,
            StressConfig {
                threads,
                iterations,
                ..defaults
            },
        )],
        Command::CasRace { threads, rounds } => vec![(
            "cas-race",
            cas_race_check as Check,
            StressConfig {
                threads,
                rounds,
                ..defaults
            },
        )],
        Command::MessagePassing { rounds } => vec![(
            "message-passing",
            message_passing_check as Check,
            StressConfig { rounds, ..defaults },
        )],
        Command::Bitops {
            threads,
            iterations,
        } => vec![(
            "bitops",
            bitops_check as Check,
            StressConfig {
                threads,
                iterations,
                ..defaults
            },
        )],
        Command::All { threads } => {
            let config = StressConfig {
                threads,
                ..defaults
            };
            vec![
                ("add", add_check as Check, config),
                ("cas-race", cas_race_check as Check, config),
                ("message-passing", message_passing_check as Check, config),
                ("bitops", bitops_check as Check, config.for_bitops()),
            ]
        }
    };

    if args.verbose {
        println!(
            "{} smp={} backoff={}",
            style(format!("{} on {}", env!("CARGO_PKG_NAME"), std::env::consts::ARCH)).bold(),
            cfg!(feature = "smp"),
            cfg!(feature = "backoff"),
        );
    }

    let mut failures = 0;
    for (name, check, config) in plan {
        if args.verbose {
            println!("     {}", style(format!("{config:?}")).dim());
        }
        match check(&config) {
            Ok(report) => print_report(&report, args.verbose),
            Err(error) => {
                print_failure(name, &error);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

#[test]
fn test_thread_counts_are_validated() {
    assert!(Cli::try_parse_from(["atomics_stress", "cas-race", "--threads", "2147483647"]).is_err());
    assert!(Cli::try_parse_from(["atomics_stress", "add", "--threads", "0"]).is_err());
    assert!(Cli::try_parse_from(["atomics_stress", "bitops", "--threads", "32"]).is_err());
    assert!(Cli::try_parse_from(["atomics_stress", "cas-race", "--rounds", "0"]).is_err());

    let cli = Cli::try_parse_from(["atomics_stress", "all", "--threads", "40"]).unwrap();
    assert!(matches!(cli.command, Command::All { threads: 40 }));
}
