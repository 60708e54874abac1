//! Terminal rendering for routes and solver comparisons

use crate::solver::{ClassicOutcome, PsbOutcome, RouteResult};

/// Displays a computed route as a hop table
pub fn print_route(label: &str, route: &RouteResult) {
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(72));
    println!("\x1b[1;36m  {} ROUTE: {}\x1b[0m", label, route.token_path());
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(72));
    println!();

    if route.steps.is_empty() {
        println!("  Source equals target; nothing to do.");
        println!();
        return;
    }

    println!(
        "  \x1b[1m{:<3} {:<28} │ {:>6} │ {:>12} │ {:>8}\x1b[0m",
        "#", "Hop", "Kind", "Rate", "Gas"
    );
    println!("  {}", "─".repeat(68));

    for (i, step) in route.steps.iter().enumerate() {
        let hop = format!("{} -> {}", step.from, step.to);
        println!(
            "  {:<3} {:<28} │ {:>6} │ {:>12.6} │ {:>8.4}",
            i + 1,
            hop,
            step.kind.to_string(),
            step.details.rate,
            step.details.gas
        );
        if let Some(dex) = &step.details.dex {
            println!("      via {}", dex);
        }
        if let Some(fee) = step.details.bridge_fee {
            println!("      bridge fee {:.6}", fee);
        }
    }

    println!();
    println!(
        "  Total weight: \x1b[1m{:.6}\x1b[0m | Estimated output: \x1b[1;32m{:.6}\x1b[0m | Hops: {}",
        route.total_weight,
        route.estimated_output,
        route.hop_count()
    );
    println!();
}

/// Displays both solvers' metrics side by side
pub fn print_comparison(classic: &ClassicOutcome, psb: &PsbOutcome) {
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(72));
    println!("\x1b[1;36m  SOLVER COMPARISON\x1b[0m");
    println!("\x1b[1;36m{}\x1b[0m", "═".repeat(72));
    println!();

    println!(
        "  \x1b[1m{:<24} │ {:>16} │ {:>16}\x1b[0m",
        "Metric", "Classic", "PSB"
    );
    println!("  {}", "─".repeat(62));
    println!(
        "  {:<24} │ {:>16.6} │ {:>16.6}",
        "Total weight", classic.route.total_weight, psb.route.total_weight
    );
    println!(
        "  {:<24} │ {:>16.6} │ {:>16.6}",
        "Estimated output", classic.route.estimated_output, psb.route.estimated_output
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Hops", classic.metrics.path_length, psb.metrics.path_length
    );
    println!(
        "  {:<24} │ {:>16.3} │ {:>16.3}",
        "Execution (ms)", classic.metrics.execution_time_ms, psb.metrics.execution_time_ms
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Visited nodes", classic.metrics.visited_nodes, psb.metrics.visited_nodes
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Heap operations",
        classic.metrics.heap_operations,
        "-"
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Pivots found", "-", psb.metrics.pivots_found
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Barriers", "-", psb.metrics.barrier_count
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Frontier reductions", "-", psb.metrics.frontier_reductions
    );
    println!(
        "  {:<24} │ {:>16} │ {:>16}",
        "Recursion levels", "-", psb.metrics.level_count
    );
    println!();

    let delta = (classic.route.total_weight - psb.route.total_weight).abs();
    let agreement = if delta <= 1e-9 * classic.route.total_weight.abs().max(1.0) {
        "\x1b[1;32mAGREE\x1b[0m"
    } else {
        "\x1b[1;31mDIVERGE\x1b[0m"
    };
    println!("  Weight agreement: {} (|Δ| = {:.3e})", agreement, delta);
    println!();
}
