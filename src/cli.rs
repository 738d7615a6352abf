// File: src/cli.rs
//! Shared command-line interface logic, like printing help.

pub fn print_help(binary_name: &str) {
    println!(
        "Roomweek v{} - study-room booking watcher",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS]                          Scrape the workweek and print the calendar", binary_name);
    println!("    {} --room <id> --start <t> --end <t>  Ad-hoc: list friend bookings for one room", binary_name);
    println!("    {} --help                             Show this help message", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    --json                Emit the week report as JSON instead of a listing.");
    println!("    --room <id>           Resource (room) UUID for an ad-hoc query.");
    println!("    --start <ISO8601>     UTC window start, e.g. 2025-08-08T22:00:00Z (ad-hoc only).");
    println!("    --end <ISO8601>       UTC window end (ad-hoc only).");
    println!("    --token <bearer>      Bearer token; overrides storage_state.json and ROOMWEEK_TOKEN.");
    println!("    -r, --root <path>     Use a different directory for config and data.");
    println!("    -v, --verbose         Debug logging.");
    println!("    -h, --help            Show this help message.");
    println!();
    println!("CONFIG FILES (in the config directory):");
    println!("    config.toml           API base, worker limit, timeouts, retry policy.");
    println!("    friends.json          {{\"ids\": [...], \"match_fields\": [...]}}");
    println!("    ignore_rooms.json     {{\"rooms\": [\"080.10.04\", ...]}}");
    println!("    rooms.json            [{{\"id\": \"<uuid>\", \"code\": \"010.05.68\", \"name\": \"...\"}}]");
    println!("    storage_state.json    Playwright session capture the bearer token is read from.");
}
