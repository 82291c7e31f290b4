use std::path::PathBuf;
use std::process::ExitCode;

use anstream::eprintln;
use anstream::print;
use anstream::println;
use clap::Parser;
use owo_colors::OwoColorize;

use maze_search::algorithms::tree_search::SearchError;
use maze_search::algorithms::tree_search::TreeSearch;
use maze_search::data_structures::frontier::FrontierKind;
use maze_search::problems::maze_2d::Maze2DProblem;
use maze_search::problems::maze_2d::Maze2DSyntax;
use maze_search::problems::maze_2d::RaggedRows;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Finds a path through text mazes.
#[derive(Parser, Debug)]
#[clap(long_version = maze_search::build::CLAP_LONG_VERSION)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Maze files, one text row per maze row.
    #[arg(required = true)]
    pub problems: Vec<PathBuf>,

    /// Frontier ordering. `stack` searches depth-first, `queue` breadth-first.
    #[arg(short, long, env = "MAZE_FRONTIER", value_enum, default_value_t = FrontierKind::Stack)]
    pub frontier: FrontierKind,

    #[arg(long, default_value_t = 'A')]
    pub start_marker: char,
    #[arg(long, default_value_t = 'B')]
    pub goal_marker: char,
    #[arg(long, default_value_t = ' ')]
    pub open_char: char,
    /// Rejects rows shorter than the widest one instead of padding them with
    /// open floor.
    #[arg(long)]
    pub strict: bool,

    /// Marks explored cells in the drawing.
    #[arg(long)]
    pub show_explored: bool,
    /// Prints memory usage of each search.
    #[arg(long)]
    pub stats: bool,

    #[command(flatten)]
    color: colorchoice_clap::Color,
}

impl Args {
    fn syntax(&self) -> Maze2DSyntax {
        Maze2DSyntax {
            start: self.start_marker,
            goal: self.goal_marker,
            open: self.open_char,
            ragged_rows: if self.strict {
                RaggedRows::Reject
            } else {
                RaggedRows::Open
            },
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    args.color.write_global();
    let syntax = args.syntax();

    let mut failures = 0usize;
    for p in &args.problems {
        println!("{} {:?} ({})", "Maze".bold(), p.yellow(), args.frontier);

        let problem = match Maze2DProblem::load(p.as_path(), &syntax) {
            Ok(problem) => problem,
            Err(e) => {
                eprintln!("{} {e}", "error:".red().bold());
                failures += 1;
                continue;
            }
        };
        log::debug!("{problem}");

        let mut search = TreeSearch::new(&problem, args.frontier);
        match search.find_path() {
            Ok(path) => {
                println!(
                    "Solution: {} actions, {} states explored",
                    path.len().green(),
                    search.num_explored()
                );
                let render = problem.render(Some(&path));
                if args.show_explored {
                    print!("{}", render.with_explored(search.explored()));
                } else {
                    print!("{render}");
                }
            }
            Err(e @ SearchError::NoSolution { .. }) => {
                eprintln!("{} {e}", "unsolvable:".red().bold());
                failures += 1;
            }
        }

        if args.stats {
            if let Err(e) = search.write_memory_stats(std::io::stdout().lock()) {
                log::error!("Failed to write stats: {e}");
            }
        }
    }

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
