use tracing::info;
use tracing_subscriber::EnvFilter;

use tokenroute::config::{Config, SolverChoice};
use tokenroute::display;
use tokenroute::{classic_dijkstra, psb_dijkstra, RouteGraph, TokenKey};

fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tokenroute=info".parse()?))
        .init();

    println!();
    println!("==================================================");
    println!("   CROSS-CHAIN ROUTE FINDER");
    println!("   Classic Dijkstra vs PSB (BMSSP) comparison");
    println!("==================================================");
    println!();

    let config = Config::from_env()?;
    info!(
        "Routing {} -> {} (max {} hops)",
        config.source, config.target, config.max_hops
    );

    let graph = build_demo_graph();
    info!(
        "Demo graph ready: {} vertices, {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    match config.solver {
        SolverChoice::Classic => {
            let outcome = classic_dijkstra(&graph, &config.source, &config.target, config.max_hops)?;
            display::print_route("CLASSIC", &outcome.route);
            println!("{}", serde_json::to_string_pretty(&outcome.route)?);
        }
        SolverChoice::Psb => {
            let outcome = psb_dijkstra(&graph, &config.source, &config.target, config.max_hops)?;
            display::print_route("PSB", &outcome.route);
            println!("{}", serde_json::to_string_pretty(&outcome.route)?);
        }
        SolverChoice::Both => {
            let classic =
                classic_dijkstra(&graph, &config.source, &config.target, config.max_hops)?;
            let psb = psb_dijkstra(&graph, &config.source, &config.target, config.max_hops)?;
            display::print_route("CLASSIC", &classic.route);
            display::print_route("PSB", &psb.route);
            display::print_comparison(&classic, &psb);
            println!("{}", serde_json::to_string_pretty(&classic.route)?);
        }
    }

    Ok(())
}

/// A small cross-chain showcase: three majors on three chains, swaps inside
/// each chain and stable/native bridges between them.
fn build_demo_graph() -> RouteGraph {
    let mut g = RouteGraph::new();

    let chains = ["ethereum", "arbitrum", "polygon"];
    for chain in chains {
        let eth = TokenKey::new("ETH", chain);
        let usdc = TokenKey::new("USDC", chain);
        let wbtc = TokenKey::new("WBTC", chain);

        // Intra-chain swap pairs, both directions. Mainnet gas dominates.
        let gas = if chain == "ethereum" { 0.004 } else { 0.0008 };
        g.add_swap(eth.clone(), usdc.clone(), 3050.0, gas, "uniswap-v3");
        g.add_swap(usdc.clone(), eth.clone(), 1.0 / 3065.0, gas, "uniswap-v3");
        g.add_swap(wbtc.clone(), usdc.clone(), 64200.0, gas, "uniswap-v3");
        g.add_swap(usdc.clone(), wbtc.clone(), 1.0 / 64500.0, gas, "uniswap-v3");
        g.add_swap(eth.clone(), wbtc.clone(), 0.0473, gas, "sushiswap");
        g.add_swap(wbtc, eth, 21.05, gas, "sushiswap");
    }

    // Bridges: same asset across chains, slight haircut plus a flat fee
    for (i, from_chain) in chains.iter().enumerate() {
        for (j, to_chain) in chains.iter().enumerate() {
            if i == j {
                continue;
            }
            for symbol in ["ETH", "USDC"] {
                g.add_bridge(
                    TokenKey::new(symbol, from_chain),
                    TokenKey::new(symbol, to_chain),
                    0.9992,
                    0.0015,
                    0.0008,
                );
            }
        }
    }

    g
}
