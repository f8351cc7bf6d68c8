use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::PluginsCommand;
use crate::plugins::PluginManager;
use crate::ui;

pub fn run(ctx: &Context, cmd: PluginsCommand) -> Result<()> {
    match cmd {
        PluginsCommand::List => list(ctx),
    }
}

fn list(ctx: &Context) -> Result<()> {
    let manager = PluginManager::with_builtins();
    let plugins = manager.list();

    ui::header("Plugins");
    for info in &plugins {
        println!(
            "  {:<12} {} {}",
            info.name.bold(),
            format!("v{}", info.version).dimmed(),
            format!("({} rule(s))", info.rules).dimmed()
        );
        if !ctx.quiet {
            ui::dim(&format!("  {}", info.description));
        }
    }
    println!();
    ui::dim("Load with `dotwin recommend --plugin <name>` or the `plugins` setting");
    Ok(())
}
