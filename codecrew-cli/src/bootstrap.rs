use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

pub const ENV_FILE: &str = ".env";
pub const ENV_TEMPLATE: &str = ".env.example";
pub const DATA_DIR: &str = "data";
pub const LOGS_DIR: &str = "logs";

/// One-time preparation of a working directory: data and log
/// directories plus a `.env` scaffolded from the template. Each step
/// fails with its own message so the failing step is obvious.
pub fn setup(base: &Path) -> Result<()> {
    fs::create_dir_all(base.join(DATA_DIR))
        .context("setup failed: could not create the data/ directory")?;
    println!("created {DATA_DIR}/");

    fs::create_dir_all(base.join(LOGS_DIR))
        .context("setup failed: could not create the logs/ directory")?;
    println!("created {LOGS_DIR}/");

    let env_path = base.join(ENV_FILE);
    if env_path.exists() {
        println!("{ENV_FILE} already exists, leaving it untouched");
    } else {
        let template = base.join(ENV_TEMPLATE);
        if !template.exists() {
            bail!("setup failed: {ENV_TEMPLATE} not found next to the binary's working directory");
        }
        fs::copy(&template, &env_path)
            .context("setup failed: could not scaffold .env from .env.example")?;
        println!("created {ENV_FILE} from {ENV_TEMPLATE}: fill in your API keys");
    }

    println!("setup complete");
    Ok(())
}

/// Launch-time guard: a prepared environment must exist before anything
/// talks to a provider.
pub fn ensure_prepared(base: &Path) -> Result<()> {
    if !base.join(ENV_FILE).exists() {
        bail!("no {ENV_FILE} found, run `codecrew setup` first");
    }
    // The directories are cheap to recreate if someone removed them.
    fs::create_dir_all(base.join(DATA_DIR)).context("could not create the data/ directory")?;
    fs::create_dir_all(base.join(LOGS_DIR)).context("could not create the logs/ directory")?;
    Ok(())
}
