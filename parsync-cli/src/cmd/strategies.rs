use parsync_core::Strategy;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

const STRATEGY_TABLE: [(Strategy, &str); 3] = [
    (
        Strategy::Speed,
        "run at max workers while any batch is queued; drop to min once the source is exhausted",
    ),
    (
        Strategy::Cost,
        "start at min workers; add one only when the backlog per worker passes the high-water mark",
    ),
    (
        Strategy::Balanced,
        "scale linearly between min and max workers with queue depth",
    ),
];

#[derive(Serialize)]
struct StrategyRow {
    name: &'static str,
    description: &'static str,
}

pub fn describe(strategy: Strategy) -> &'static str {
    STRATEGY_TABLE
        .iter()
        .find(|(s, _)| *s == strategy)
        .map(|(_, d)| *d)
        .unwrap_or("")
}

pub fn strategies_cmd(output: OutputArgs) -> i32 {
    let rows: Vec<StrategyRow> = Strategy::ALL
        .iter()
        .map(|s| StrategyRow {
            name: s.as_str(),
            description: describe(*s),
        })
        .collect();

    if output.format == OutputFormat::Text && !output.quiet {
        for row in &rows {
            println!("{:<10} {}", row.name, row.description);
        }
    } else {
        print_result(output.format, output.quiet, &rows);
    }
    exit_codes::SUCCESS
}
