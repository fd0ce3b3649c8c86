use std::error::Error;

use gridrl::algo::{SarsaAgent, SarsaAgentConfig};
use gridrl::env::GridWorld;

fn main() -> Result<(), Box<dyn Error>> {
    let rows = 5;
    let cols = 5;
    let world = GridWorld::new(
        rows,
        cols,
        (rows - 1, 0),
        [(0, cols - 1), (rows - 1, cols - 1)],
        [(2, 1), (2, 2), (2, 3)],
        0.8,
        0,
    )?;

    let mut agent = SarsaAgent::new(world, SarsaAgentConfig::default());
    agent.learn();

    println!("---------- GRID WORLD ----------");
    println!("{}", agent.world());
    println!("---------- POLICY MAP ----------");
    println!("{agent}");

    let stats = agent.evaluate();
    println!("goal reach percentage: {:.3}", stats.goal_reach_pct);
    println!("average reward: {:.3}", stats.avg_reward);

    agent.greedy_replay();
    println!("greedy trajectory: {:?}", agent.trajectory());

    Ok(())
}
