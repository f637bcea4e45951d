// Timezones feature module.
//
// Commands are prefixed with `tz:` and show the current time across the
// zones a community cares about.

use crate::core::modules::{
    Command, CommandContext, CommandTable, Module, ModuleDeps, ModuleDescriptor, ModuleError,
    ModuleHub, ModuleResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

const DESCRIPTOR: ModuleDescriptor = ModuleDescriptor::new("timezones").with_prefix("tz:");

pub struct TeamTimezone {
    pub label: &'static str,
    pub tz_name: &'static str,
    pub note: &'static str,
}

pub struct TimezoneDisplay {
    pub twelve_hour: String,
    pub twenty_four_hour: String,
    pub date_fragment: String,
}

pub const DEFAULT_TIMEZONES: &[TeamTimezone] = &[
    TeamTimezone {
        label: "Pacific",
        tz_name: "America/Los_Angeles",
        note: "Seattle / Vancouver",
    },
    TeamTimezone {
        label: "Eastern",
        tz_name: "America/New_York",
        note: "New York / Toronto",
    },
    TeamTimezone {
        label: "UK",
        tz_name: "Europe/London",
        note: "London / Belfast",
    },
    TeamTimezone {
        label: "Central Europe",
        tz_name: "Europe/Berlin",
        note: "Amsterdam / Paris",
    },
    TeamTimezone {
        label: "India",
        tz_name: "Asia/Kolkata",
        note: "Bengaluru / Mumbai",
    },
    TeamTimezone {
        label: "Australia",
        tz_name: "Australia/Sydney",
        note: "Sydney / Melbourne",
    },
];

pub struct TimezoneModule {
    zones: Arc<[&'static TeamTimezone]>,
    commands: CommandTable,
}

impl TimezoneModule {
    pub fn new(_deps: &ModuleDeps) -> Self {
        Self::with_zones(DEFAULT_TIMEZONES.iter().collect())
    }

    pub fn with_zones(zones: Vec<&'static TeamTimezone>) -> Self {
        let zones: Arc<[&'static TeamTimezone]> = zones.into();

        let list_zones = Arc::clone(&zones);
        let commands = CommandTable::new()
            .with(
                "list",
                Command::new(move |ctx| list(ctx, Arc::clone(&list_zones))),
            )
            .with("now", Command::new(now_in));

        Self { zones, commands }
    }
}

#[async_trait]
impl Module for TimezoneModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &DESCRIPTOR
    }

    fn commands(&self) -> &CommandTable {
        &self.commands
    }

    async fn init(&self, _hub: &Arc<ModuleHub>) -> ModuleResult {
        let invalid: Vec<&str> = self
            .zones
            .iter()
            .filter(|zone| zone.tz_name.parse::<Tz>().is_err())
            .map(|zone| zone.tz_name)
            .collect();

        if !invalid.is_empty() {
            return Err(ModuleError::Other(format!(
                "Unknown timezones configured: {}",
                invalid.join(", ")
            )));
        }

        tracing::info!(zones = self.zones.len(), "Timezones module ready");
        Ok(())
    }
}

/// Render `at` in `tz`.
pub fn format_zone(tz: Tz, at: DateTime<Utc>) -> TimezoneDisplay {
    let local = at.with_timezone(&tz);

    let twelve_hour = local.format("%I:%M %p").to_string();
    let twelve_hour = match twelve_hour.strip_prefix('0') {
        Some(stripped) => stripped.to_string(),
        None => twelve_hour,
    };

    TimezoneDisplay {
        twelve_hour,
        twenty_four_hour: local.format("%H:%M").to_string(),
        date_fragment: local.format("%a %d %b").to_string(),
    }
}

fn format_line(label: &str, note: &str, display: &TimezoneDisplay) -> String {
    format!(
        "**{}** ({}): {} / {} - {}",
        label, note, display.twelve_hour, display.twenty_four_hour, display.date_fragment
    )
}

/// Lines for `tz:list`, one per zone.
pub fn render_zones(zones: &[&TeamTimezone], at: DateTime<Utc>) -> Vec<String> {
    zones
        .iter()
        .map(|zone| {
            let tz: Tz = zone.tz_name.parse().unwrap_or(chrono_tz::UTC);
            format_line(zone.label, zone.note, &format_zone(tz, at))
        })
        .collect()
}

async fn list(ctx: CommandContext, zones: Arc<[&'static TeamTimezone]>) -> ModuleResult {
    let lines = render_zones(&zones, Utc::now());
    ctx.reply(lines.join("\n")).await
}

async fn now_in(ctx: CommandContext) -> ModuleResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return ctx.reply("Usage: `tz:now <zone>`, for example `tz:now Europe/Berlin`.").await;
    };

    match name.parse::<Tz>() {
        Ok(tz) => {
            let display = format_zone(tz, Utc::now());
            ctx.reply(format_line(&name, tz.name(), &display)).await
        }
        Err(_) => ctx.reply(format!("Unknown timezone `{}`.", name)).await,
    }
}
