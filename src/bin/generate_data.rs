use csv::Writer;
use glam::Vec3;
use navgraph::models::NodePlacement;
use navgraph::obstacles::Obstacle;
use navgraph::test_utils::generate_dummy_nodes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs::File;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let width = 40.0;
    let depth = 40.0;

    // 1. Scatter walkable nodes over the floor
    let mut nodes = generate_dummy_nodes(400, width, depth, 42);

    // 2. A few named landmarks for path queries
    nodes.push(NodePlacement {
        name: "Spawn".to_string(),
        x: 1.0,
        y: 0.0,
        z: 1.0,
    });
    nodes.push(NodePlacement {
        name: "Exit".to_string(),
        x: width - 1.0,
        y: 0.0,
        z: depth - 1.0,
    });

    // 3. Pillars, plus a wall across the middle with a gap near one end
    let mut rng = StdRng::seed_from_u64(7);
    let mut obstacles: Vec<Obstacle> = (0..12)
        .map(|_| {
            let x = rng.random_range(4.0..width - 4.0);
            let z = rng.random_range(4.0..depth - 4.0);
            Obstacle {
                min: Vec3::new(x - 0.5, -1.0, z - 0.5),
                max: Vec3::new(x + 0.5, 3.0, z + 0.5),
                mass: 0.0,
                volatile: false,
                collides_with_characters: true,
            }
        })
        .collect();
    obstacles.push(Obstacle {
        min: Vec3::new(width / 2.0 - 0.1, -1.0, 0.0),
        max: Vec3::new(width / 2.0 + 0.1, 3.0, depth - 6.0),
        mass: 0.0,
        volatile: false,
        collides_with_characters: true,
    });

    let file = File::create("nodes.csv")?;
    let mut wtr = Writer::from_writer(file);
    for node in &nodes {
        wtr.serialize(node)?;
    }
    wtr.flush()?;

    std::fs::write("obstacles.yaml", serde_yaml::to_string(&obstacles)?)?;

    println!(
        "Generated nodes.csv with {} nodes and obstacles.yaml with {} obstacles.",
        nodes.len(),
        obstacles.len()
    );
    Ok(())
}
