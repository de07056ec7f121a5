use clap::{Parser, ValueEnum};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tree_metrics::{Tree, TreeNode};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Shape {
    /// Binary-search inserts in shuffled order
    Random,
    /// One long left-leaning chain
    Chain,
}

#[derive(Parser)]
#[command(name = "tree-benchmark")]
#[command(about = "A tree metrics performance testing tool")]
struct Args {
    #[arg(long, default_value = "100000")]
    size: usize,

    #[arg(long, value_enum, default_value_t = Shape::Random)]
    shape: Shape,

    /// Number of cut and re-attach rounds
    #[arg(long, default_value = "1000")]
    rounds: usize,

    #[arg(long, default_value = "42")]
    seed: u64,
}

fn build(shape: Shape, size: usize, rng: &mut rand::rngs::StdRng) -> Tree<usize> {
    match shape {
        Shape::Random => {
            let mut values: Vec<usize> = (0..size).collect();
            values.shuffle(rng);
            values.into_iter().collect()
        }
        Shape::Chain => {
            // grow from the bottom so each attach only touches the new root
            let mut top: Option<TreeNode<usize>> = None;
            for i in (0..size).rev() {
                let node = TreeNode::new(i);
                node.set_right_child(top);
                top = Some(node);
            }
            Tree::new(top)
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);

    info!(
        size = args.size,
        shape = ?args.shape,
        rounds = args.rounds,
        "running tree benchmark"
    );

    let start = Instant::now();
    let tree = build(args.shape, args.size, &mut rng);
    assert_eq!(tree.size(), args.size);
    let height = tree.height();
    let built = Instant::now();

    let mut expected = 0;
    for node in tree.in_order() {
        assert_eq!(node.get(), expected);
        expected += 1;
    }
    let traversed = Instant::now();

    let nodes: Vec<TreeNode<usize>> = tree.pre_order().collect();
    for _ in 0..args.rounds {
        if nodes.is_empty() {
            break;
        }
        let node = &nodes[rng.random_range(0..nodes.len())];
        let Some(parent) = node.parent() else {
            continue;
        };
        let was_left = node.is_left_child();
        let subtree = node.size();

        node.cut_off_parent();
        assert_eq!(tree.size(), args.size - subtree);
        if was_left {
            parent.set_left_child(Some(node.clone()));
        } else {
            parent.set_right_child(Some(node.clone()));
        }
        assert_eq!(tree.size(), args.size);
    }
    let mutated = Instant::now();

    for _ in 0..args.size.min(10) {
        let value = rng.random_range(0..args.size);
        assert!(tree.find(&value).is_some());
    }
    let found = Instant::now();

    drop(nodes);
    drop(tree);
    let end = Instant::now();

    println!("Tree height {}", height);
    println!(
        "Building took {} seconds",
        built.saturating_duration_since(start).as_secs_f32()
    );
    println!(
        "In-order traversal took {} seconds",
        traversed.saturating_duration_since(built).as_secs_f32()
    );
    println!(
        "Cut and re-attach took {} seconds",
        mutated.saturating_duration_since(traversed).as_secs_f32()
    );
    println!(
        "Find took {} seconds",
        found.saturating_duration_since(mutated).as_secs_f32()
    );
    println!(
        "Drop took {} seconds",
        end.saturating_duration_since(found).as_secs_f32()
    );
    println!(
        "Total {} seconds",
        end.saturating_duration_since(start).as_secs_f32()
    );
}
