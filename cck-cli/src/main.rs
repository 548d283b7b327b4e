mod replay;
mod simulate;
mod table;
mod usb;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;

use cck_core::board::{self, BoardConfig};

#[derive(Parser)]
#[command(name = "cck-cli")]
#[command(about = "CCK macro pad inspection and simulation tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the pin tables of the built-in boards
    Boards {
        /// Only this board (cck-2m3-v1, cck-2m3-v2, cck-2t)
        #[arg(long)]
        board: Option<String>,
    },
    /// Run the keyboard loop on the host and print the reports it sends
    Simulate {
        #[arg(long)]
        board: String,
        /// Touch boards: recorded ADC readings, one line per iteration
        #[arg(long, conflicts_with = "levels")]
        samples: Option<String>,
        /// Switch boards: pin levels per input, 0 = pressed, e.g. 101
        #[arg(long)]
        levels: Option<String>,
        /// Loop iterations (1 ms each); defaults to one pass over the samples
        #[arg(long)]
        iterations: Option<usize>,
    },
    /// Detect if a CCK keyboard is connected
    Detect,
    /// Print keyboard reports as the keyboard sends them
    Monitor {
        /// Stop after this many reports
        #[arg(long)]
        count: Option<usize>,
    },
}

fn find_board(name: &str) -> Result<&'static BoardConfig> {
    match board::by_name(name) {
        Some(board) => Ok(board),
        None => {
            let known: Vec<&str> = board::ALL.iter().map(|b| b.name).collect();
            bail!("unknown board '{}' (known: {})", name, known.join(", "))
        }
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} iterations")
            .context("invalid progress template")?
            .progress_chars("=> "),
    );
    pb.set_message("Simulating");
    Ok(pb)
}

fn print_event(pb: &ProgressBar, event: simulate::Event) {
    pb.println(format!(
        "{:>6}  {:<24} {}",
        event.iteration,
        table::render_report(&event.report),
        table::render_indicators(event.indicators.into_iter())
    ));
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Boards { board } => {
            let boards = match board {
                Some(name) => vec![find_board(&name)?],
                None => board::ALL.to_vec(),
            };
            for (i, board) in boards.into_iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", table::render_board(board));
            }
        }
        Command::Simulate {
            board,
            samples,
            levels,
            iterations,
        } => {
            let board = find_board(&board)?;

            if board.is_touch() {
                let Some(path) = samples else {
                    bail!("{} is a touch board: pass --samples FILE", board.name);
                };
                let contents =
                    fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
                let channels = simulate::touch_muxes(board).len();
                let lines = replay::parse_samples(&contents, channels)
                    .with_context(|| format!("parsing {}", path))?;

                let iterations = iterations.unwrap_or(lines.len());
                let pb = progress_bar(iterations)?;
                simulate::run_touch(board, &lines, iterations, &pb, |e| print_event(&pb, e))?;
                pb.finish_with_message("Done");
            } else {
                let Some(levels) = levels else {
                    bail!("{} is a switch board: pass --levels BITS", board.name);
                };
                let levels = replay::parse_levels(&levels, board.inputs.len())?;

                let iterations = iterations.unwrap_or(1);
                let pb = progress_bar(iterations)?;
                simulate::run_switches(board, &levels, iterations, &pb, |e| print_event(&pb, e))?;
                pb.finish_with_message("Done");
            }
        }
        Command::Detect => {
            if usb::detect()? {
                println!("CCK keyboard detected.");
            } else {
                println!("CCK keyboard not detected.");
            }
        }
        Command::Monitor { count } => {
            usb::monitor(count, table::render_report)?;
        }
    }

    Ok(())
}
