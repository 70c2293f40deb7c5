use std::{env, env::VarError};

/// There's no real CLI for the worker, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // RCW_RPC_URL usually embeds an API key, so it is left out
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "RCW_DATABASE_URL",
        "RCW_DB_MAX_CONNECTIONS",
        "RCW_SDK_URL",
        "RCW_SEARCH_URL",
        "RCW_DO_BACKGROUND_WORK",
        "RCW_DO_SEARCH_WORK",
        "RCW_ACTIVITY_TRIGGER_INTERVAL_SECS",
        "RCW_FIX_PAGE_SIZE",
        "RCW_POOL_REFRESH_TTL_SECS",
        "RCW_ACTIVITY_BATCH_SIZE",
        "RCW_MINT_ADDRESSES",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
