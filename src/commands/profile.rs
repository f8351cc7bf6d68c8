use anyhow::Result;
use termkit::NewProgress;

use crate::Context;
use crate::cli::ProfileArgs;
use crate::recommend::SystemProfile;
use crate::ui;

pub fn run(ctx: &mut Context, args: ProfileArgs) -> Result<()> {
    let profile = collect(ctx)?;
    display(&profile);

    if let Some(path) = &args.output {
        profile.save(path)?;
        ctx.progress
            .success(&format!("Saved profile to {}", path.display()));
    }
    Ok(())
}

/// Query the system inside a progress node
pub fn collect(ctx: &mut Context) -> Result<SystemProfile> {
    ctx.progress.scoped(
        NewProgress::new("Collecting system profile").status("Querying CIM and registry"),
        |_, _| SystemProfile::collect(),
    )
}

pub fn display(profile: &SystemProfile) {
    ui::header("System profile");

    ui::section("Operating system");
    ui::kv("name", &profile.os.name);
    ui::kv("version", &profile.os.version);
    ui::kv("build", &profile.os.build.to_string());

    let hw = &profile.hardware;
    ui::section("Hardware");
    ui::kv("cpu", &format!("{} ({} threads)", hw.cpu, hw.logical_cores));
    ui::kv("memory", &ui::format_gb(hw.memory_gb));
    let free = hw
        .disk_free_percent()
        .map(|p| format!(" ({p:.0}% free)"))
        .unwrap_or_default();
    ui::kv(
        "system disk",
        &format!(
            "{} of {}{}",
            ui::format_gb(hw.disk_free_gb),
            ui::format_gb(hw.disk_total_gb),
            free
        ),
    );
    ui::kv("ssd", &ui::yes_no(hw.ssd));

    let sw = &profile.software;
    ui::section("Software");
    ui::kv("packages", &sw.packages.len().to_string());
    ui::kv("winget", &ui::yes_no(Some(sw.winget)));
    ui::kv("choco", &ui::yes_no(Some(sw.choco)));

    let settings = &profile.settings;
    ui::section("Settings");
    ui::kv("dark mode", &ui::yes_no(settings.dark_mode));
    ui::kv("file extensions", &ui::yes_no(settings.file_extensions_visible));
    ui::kv("hidden files", &ui::yes_no(settings.hidden_files_visible));
    ui::kv(
        "telemetry level",
        &settings
            .telemetry_level
            .map_or_else(|| "unknown".to_string(), |l| l.to_string()),
    );
    ui::kv("developer mode", &ui::yes_no(settings.developer_mode));

    println!();
    ui::dim(&format!(
        "collected {}",
        profile.collected_at.format("%Y-%m-%d %H:%M:%S")
    ));
}
