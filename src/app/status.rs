use crate::config::Config;
use crate::schema::SchemaRegistry;

pub fn render_status(config: &Config, registry: &SchemaRegistry, stored: Option<u32>) -> String {
    let layout = config.layout();
    let first = registry.first_version();
    let current = registry.current_version();

    let stored_line = match stored {
        None => t!("status.fresh_install").to_string(),
        Some(v) if v < first => format!("{v} ({})", t!("status.too_old")),
        Some(v) if v < current => format!("{v} ({})", t!("status.pending")),
        Some(v) if v == current => format!("{v} ({})", t!("status.up_to_date")),
        Some(v) => format!("{v} ({})", t!("status.too_new")),
    };
    let database = stored.map_or_else(|| layout.final_db(), |v| layout.live_db(v));

    let mut lines = vec![
        format!("◆ {}", t!("status.title")),
        String::new(),
        format!("  {}          {}", t!("status.version"), env!("CARGO_PKG_VERSION")),
        format!("  {}     {}", t!("status.working_path"), layout.working_path().display()),
        format!("  {}           {}", t!("status.config"), config.config_path.display()),
        format!("  {}         {}", t!("status.database"), database.display()),
        String::new(),
        format!("  {} {stored_line}", t!("status.stored_version")),
        format!("  {}    {first}..={current}", t!("status.supported_range")),
    ];
    if let Some(before) = config.database.legacy_layout_before {
        lines.push(format!(
            "  {}        {} (< {before})",
            t!("status.legacy_layout"),
            layout.legacy_dir().display()
        ));
    }
    lines.join("\n")
}
