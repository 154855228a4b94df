use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::Shell;

// Only clap types live in cli.rs, so it builds here without the crate.
#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = PathBuf::from(std::env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?);
    let mut cmd = cli::Cli::command();

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;
    write_man_pages(&cmd, None, &man_dir)?;

    let completion_dir = out_dir.join("completions");
    fs::create_dir_all(&completion_dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, "livecount", &completion_dir)?;
    }

    Ok(())
}

/// One page per visible command, named `livecount-<sub>.1` below the root.
fn write_man_pages(cmd: &clap::Command, parent: Option<&str>, dir: &Path) -> std::io::Result<()> {
    let page = match parent {
        Some(parent) => format!("{parent}-{}", cmd.get_name()),
        None => cmd.get_name().to_owned(),
    };

    let mut rendered = Vec::new();
    clap_mangen::Man::new(cmd.clone().name(page.clone())).render(&mut rendered)?;
    fs::write(dir.join(format!("{page}.1")), rendered)?;

    cmd.get_subcommands()
        .filter(|sub| !sub.is_hide_set())
        .try_for_each(|sub| write_man_pages(sub, Some(&page), dir))
}
