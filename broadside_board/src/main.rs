// CLI for inspecting board commitments.
//
// Builds a board with fresh salts, commits it, and prints the root along
// with every cell's leaf and proof. With `--ships` it also runs ship
// extraction against the given inventory. Output contains salts, so it is
// a debugging aid and never something a client would transmit.
//
// Usage:
//   board-commit --side <N> [OPTIONS]
//     --side <N>              Board side, 4..=8
//     --occupied <I,J,...>    Occupied cell indices (default: none)
//     --ships <A,B,C,D>       Ship counts for lengths 1..4
//     --json                  Print JSON instead of text

use broadside_board::report::CommitReport;
use broadside_board::{Board, SaltSet};
use broadside_protocol::{BoardSize, ShipCounts};

struct Args {
    side: u8,
    occupied: Vec<u8>,
    ships: Option<ShipCounts>,
    json: bool,
}

fn main() {
    let args = parse_args();

    let size = BoardSize::from_side(args.side).unwrap_or_else(|e| fail(&e.to_string()));
    let board = Board::with_occupied(size, &SaltSet::generate(), &args.occupied)
        .unwrap_or_else(|e| fail(&e.to_string()));
    let report = CommitReport::build(&board, args.ships.as_ref())
        .unwrap_or_else(|e| fail(&e.to_string()));

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(&format!("Failed to encode report: {e}")),
        }
    } else {
        print!("{}", report.to_text());
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

/// Parse a comma-separated list of numbers.
fn parse_list(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() {
        return Some(Vec::new());
    }
    s.split(',').map(|p| p.trim().parse().ok()).collect()
}

fn parse_args() -> Args {
    let mut side = None;
    let mut occupied = Vec::new();
    let mut ships = None;
    let mut json = false;
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--side" => {
                i += 1;
                side = Some(
                    args.get(i)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| fail("--side requires a number")),
                );
            }
            "--occupied" => {
                i += 1;
                occupied = args
                    .get(i)
                    .and_then(|s| parse_list(s))
                    .unwrap_or_else(|| fail("--occupied requires a list like 0,5,10"));
            }
            "--ships" => {
                i += 1;
                let counts = args
                    .get(i)
                    .and_then(|s| parse_list(s))
                    .and_then(|v| <[u8; 4]>::try_from(v).ok())
                    .unwrap_or_else(|| fail("--ships requires four counts like 1,2,0,0"));
                ships = Some(ShipCounts::new(counts));
            }
            "--json" => json = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(side) = side else {
        print_usage();
        std::process::exit(1);
    };
    Args {
        side,
        occupied,
        ships,
        json,
    }
}

fn print_usage() {
    println!("Usage: board-commit --side <N> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --side <N>              Board side, 4..=8");
    println!("  --occupied <I,J,...>    Occupied cell indices");
    println!("  --ships <A,B,C,D>       Ship counts for lengths 1..4");
    println!("  --json                  Print JSON instead of text");
    println!("  --help, -h              Show this help");
}
