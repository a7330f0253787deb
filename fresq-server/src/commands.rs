// fresq-server/src/commands.rs

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;
use fresq_core::Error;
use fresq_core::models::{NewPackConfig, PackUpdate};

use crate::context::ServerContext;

/// Operator commands, usable from the command line or the `serve` console.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Keep running, log every broadcast and read commands from stdin.
    Serve,
    /// Apply migrations and exit.
    Migrate,

    /// Look up a code and show which cell it holds.
    Validate { code: String },
    Claim { code: String, x: i32, y: i32 },
    Paint { code: String, color: i32 },
    /// Grid config and all painted cells.
    Snapshot,
    /// Print the config only if its state version differs from VERSION.
    Config { version: Option<i64> },
    /// Codes owned by a user.
    UserCodes { user_id: Uuid },

    Tier,
    TierProgress,
    Tiers,
    NextTier,
    /// Re-run the upgrade check.
    UpgradeCheck,

    Packs,
    CreateTicket { email: String },
    CreatePack { email: String, pack: String },
    /// Mark an order paid and mint its codes.
    Confirm { order_id: String },
    /// Cancel a pending order or refund a paid one.
    Cancel { order_id: String },
    Ticket { order_id: String },
    Tickets {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    ClearCell { x: i32, y: i32 },
    ResetColor { x: i32, y: i32 },
    /// Release every cell. Requires --yes.
    ResetGrid {
        #[arg(long)]
        yes: bool,
    },
    /// Replace the palette with ten #RRGGBB colours.
    Palette {
        #[arg(num_args = 10)]
        colors: Vec<String>,
    },
    GenerateCodes { count: i64 },
    Inspect { x: i32, y: i32 },
    RecentCodes {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    Stats,

    /// Paid purchases, units and revenue per active pack.
    PackStats,
    /// Add a pack to the catalog. Total and discount are derived.
    AddPack {
        key: String,
        label: String,
        base: i32,
        price_cents: i64,
        #[arg(long, default_value_t = 0)]
        bonus: i32,
        #[arg(long, default_value_t = 0)]
        display_order: i32,
    },
    /// Change some fields of a pack.
    EditPack {
        key: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        base: Option<i32>,
        #[arg(long)]
        bonus: Option<i32>,
        #[arg(long)]
        price_cents: Option<i64>,
        #[arg(long)]
        display_order: Option<i32>,
        #[arg(long)]
        active: Option<bool>,
    },
    RemovePack { key: String },
}

/// One line typed into the `serve` console.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
pub struct ConsoleLine {
    #[command(subcommand)]
    pub command: Command,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one command and prints its result as JSON. Domain errors are printed
/// with their stable code and reported back as `Err`.
pub async fn execute(ctx: &ServerContext, command: Command) -> Result<(), Error> {
    let result = dispatch(ctx, command).await;
    if let Err(e) = &result {
        error!("Command failed: {}", e);
        print_json(&json!({ "ok": false, "error": e.code(), "message": e.to_string() }))?;
    }
    result
}

async fn dispatch(ctx: &ServerContext, command: Command) -> Result<(), Error> {
    match command {
        Command::Serve | Command::Migrate => {
            println!("'serve' and 'migrate' are only available at startup");
            Ok(())
        }

        Command::Validate { code } => match ctx.canvas.validate_code(&code).await? {
            Some(found) => print_json(&json!({ "valid": true, "code": found })),
            None => print_json(&json!({ "valid": false, "error": "invalid_code" })),
        },
        Command::Claim { code, x, y } => {
            let outcome = ctx.canvas.claim_cell(&code, x, y).await?;
            print_json(&json!({ "ok": outcome.is_ok(), "outcome": outcome }))
        }
        Command::Paint { code, color } => {
            let outcome = ctx.canvas.paint_cell(&code, color).await?;
            print_json(&json!({ "ok": outcome.is_ok(), "outcome": outcome }))
        }
        Command::Snapshot => print_json(&ctx.canvas.snapshot().await?),
        Command::Config { version } => {
            match ctx.canvas.config_if_changed(version.unwrap_or(-1)).await? {
                Some(config) => print_json(&config),
                None => print_json(&json!({ "changed": false })),
            }
        }
        Command::UserCodes { user_id } => print_json(&ctx.canvas.codes_for_user(user_id).await?),

        Command::Tier => print_json(&ctx.tiers.current_tier().await?),
        Command::TierProgress => print_json(&ctx.tiers.tier_progress().await?),
        Command::Tiers => print_json(&ctx.tiers.all_tiers().await?),
        Command::NextTier => print_json(&ctx.tiers.next_tier().await?),
        Command::UpgradeCheck => print_json(&ctx.tiers.evaluate_upgrade().await?),

        Command::Packs => print_json(&ctx.tickets.available_packs().await?),
        Command::CreateTicket { email } => print_json(&ctx.tickets.create_ticket(&email).await?),
        Command::CreatePack { email, pack } => {
            print_json(&ctx.tickets.create_pack_purchase(&email, &pack).await?)
        }
        Command::Confirm { order_id } => print_json(&ctx.tickets.confirm_payment(&order_id).await?),
        Command::Cancel { order_id } => print_json(&ctx.tickets.cancel_ticket(&order_id).await?),
        Command::Ticket { order_id } => match ctx.tickets.get_ticket(&order_id).await? {
            Some(ticket) => print_json(&ticket),
            None => Err(Error::NotFound(format!("ticket {order_id}"))),
        },
        Command::Tickets { email, limit } => {
            let tickets = match email {
                Some(email) => ctx.tickets.tickets_for_email(&email).await?,
                None => ctx.tickets.recent_tickets(limit).await?,
            };
            print_json(&tickets)
        }

        Command::ClearCell { x, y } => print_json(&ctx.admin.clear_cell(x, y).await?),
        Command::ResetColor { x, y } => print_json(&ctx.admin.reset_cell_color(x, y).await?),
        Command::ResetGrid { yes } => {
            if !yes {
                println!("refusing to reset the grid without --yes");
                return Ok(());
            }
            let released = ctx.admin.reset_grid().await?;
            print_json(&json!({ "ok": true, "released": released }))
        }
        Command::Palette { colors } => print_json(&ctx.admin.update_palette(colors).await?),
        Command::GenerateCodes { count } => print_json(&ctx.admin.generate_codes(count).await?),
        Command::Inspect { x, y } => print_json(&ctx.admin.inspect_cell(x, y).await?),
        Command::RecentCodes { limit } => print_json(&ctx.admin.recent_codes(limit).await?),
        Command::Stats => print_json(&ctx.admin.stats().await?),

        Command::PackStats => print_json(&ctx.admin.pack_stats().await?),
        Command::AddPack { key, label, base, price_cents, bonus, display_order } => {
            let new_pack = NewPackConfig {
                pack_key: key,
                label,
                base_tickets: base,
                bonus_tickets: bonus,
                price_cents,
                display_order,
            };
            print_json(&ctx.admin.create_pack(new_pack).await?)
        }
        Command::EditPack { key, label, base, bonus, price_cents, display_order, active } => {
            let update = PackUpdate {
                label,
                base_tickets: base,
                bonus_tickets: bonus,
                price_cents,
                display_order,
                is_active: active,
            };
            print_json(&ctx.admin.update_pack(&key, update).await?)
        }
        Command::RemovePack { key } => {
            ctx.admin.delete_pack(&key).await?;
            print_json(&json!({ "ok": true, "removed": key }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, clap::Error> {
        ConsoleLine::try_parse_from(line.split_whitespace()).map(|l| l.command)
    }

    #[test]
    fn test_console_lines_parse() {
        assert!(matches!(
            parse("claim ABCD2345 10 10"),
            Ok(Command::Claim { ref code, x: 10, y: 10 }) if code == "ABCD2345"
        ));
        assert!(matches!(parse("paint ABCD2345 4"), Ok(Command::Paint { color: 4, .. })));
        assert!(matches!(parse("reset-grid --yes"), Ok(Command::ResetGrid { yes: true })));
        assert!(matches!(
            parse("tickets --email a@b.co"),
            Ok(Command::Tickets { email: Some(_), limit: 20 })
        ));
        assert!(matches!(parse("config"), Ok(Command::Config { version: None })));
    }

    #[test]
    fn test_pack_admin_lines_parse() {
        assert!(matches!(
            parse("add-pack duo Duo 2 380 --bonus 1"),
            Ok(Command::AddPack { base: 2, price_cents: 380, bonus: 1, display_order: 0, .. })
        ));
        assert!(matches!(
            parse("edit-pack mini --price-cents 500 --active false"),
            Ok(Command::EditPack { price_cents: Some(500), active: Some(false), base: None, .. })
        ));
        assert!(matches!(parse("remove-pack mini"), Ok(Command::RemovePack { .. })));
        assert!(matches!(parse("pack-stats"), Ok(Command::PackStats)));
    }

    #[test]
    fn test_console_rejects_bad_lines() {
        assert!(parse("claim ABCD2345 ten 10").is_err());
        assert!(parse("palette #000000 #FFFFFF").is_err());
        assert!(parse("fly-away").is_err());
    }
}
