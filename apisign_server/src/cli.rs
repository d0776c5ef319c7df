use std::{env, env::VarError};

const README: &str = include_str!("./cli-help.txt");

// Be explicit about which envars to print, so as to avoid accidentally exposing secrets. Nothing here may name a
// secret, and the static backend's secrets live in a file rather than the environment.
const DISPLAY_ENVS: [&str; 13] = [
    "RUST_LOG",
    "APISIGN_HOST",
    "APISIGN_PORT",
    "APISIGN_BACKEND",
    "APISIGN_STATIC_CONFIG",
    "APISIGN_DATABASE_URL",
    "APISIGN_SALT_MODE",
    "APISIGN_SIGNATURE_TTL_MS",
    "APISIGN_DYNAMIC_SALT_TTL_MS",
    "APISIGN_SALT_GENERATE_PATH",
    "APISIGN_SIGN_GENERATE_PATH",
    "APISIGN_DEFAULT_WITH_PARAMS",
    "APISIGN_SALT_PURGE_INTERVAL_SECS",
];

/// The server takes no arguments. If any are given, print the help text and the current configuration environment,
/// and return `true` so that the caller can exit.
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        println!("\n{README}\n");
        println!("Current environment values (EXCLUDING variables that contain secrets):");
        for name in DISPLAY_ENVS {
            println!("  {name:<35} {:<15}", env_value(name));
        }
    }
    has_cli_args
}

fn env_value(name: &str) -> String {
    match env::var(name) {
        Ok(s) => s,
        Err(VarError::NotPresent) => "Not set".into(),
        Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
    }
}
