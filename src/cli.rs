use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::categorize::{Categorizer, KeywordRule};
use crate::db::Database;
use crate::format::{budget_bar, format_brl, format_cnpj, format_percentage, truncate};
use crate::functions::{self, Method, Request};
use crate::models::{BudgetDraft, DealFilter, MarketDraft, ProductDraft, PurchaseRecordDraft};
use crate::receipt::{self, ReceiptOutcome, ReceiptRequest};
use crate::service;

pub(crate) fn as_cli(args: &[String], db: &mut Database) -> Result<()> {
    let rest = args.get(2..).unwrap_or_default();
    match args.get(1).map(String::as_str).unwrap_or("help") {
        "record" => cli_record(rest, db),
        "budget" => cli_budget(rest, db),
        "status" => cli_status(rest, db),
        "categories" => cli_categories(rest, db),
        "records" => cli_records(rest, db),
        "summary" | "s" => cli_summary(rest, db),
        "receipt" => cli_receipt(rest, db),
        "market" => cli_market(rest, db),
        "markets" => cli_markets(rest, db),
        "product" => cli_product(rest, db),
        "deals" => cli_deals(rest, db),
        "company" => cli_company(rest, db),
        "export" => cli_export(rest, db),
        "invoke" => cli_invoke(rest, db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("barganha {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

pub(crate) fn print_usage() {
    println!("Barganha - grocery purchases, budgets and price comparison");
    println!();
    println!("Usage: barganha <command> [args]");
    println!();
    println!("Commands:");
    println!("  record <user> <amount> <category>     Record a purchase");
    println!("    --date <YYYY-MM-DD> --market <name> --desc <text>");
    println!("  budget <user> <category> <limit>      Set a category budget");
    println!("    --month <YYYY-MM>                   Month (default: current)");
    println!("  status <user> [--month <YYYY-MM>]     Budget status per category");
    println!("  categories <user>                     List purchase categories");
    println!("  records <user>                        List purchases, newest first");
    println!("    --limit <1-100> --offset <n>");
    println!("  summary <user> [--month <YYYY-MM>]    Spending summary");
    println!("  receipt <user> <file.txt>             Record purchases from receipt text");
    println!("    --vendor <name>                     Market name for the records");
    println!("    --rule <keyword=category>           Extra keyword rule (repeatable)");
    println!("    --regex <pattern=category>          Extra regex rule (repeatable)");
    println!("  market <user> <name>                  Register a market");
    println!("    --address <text> --cnpj <cnpj>");
    println!("  markets <user>                        List markets");
    println!("  product <user> <name> <category>      Register a product");
    println!("    --price <n> --unit <u> --barcode <gtin> --brand <b> --market-id <id>");
    println!("  deals <user>                          Cheapest offer per product");
    println!("    --category <c> --market-id <id> --max-price <n>");
    println!("  company <cnpj> [--from <file.json>]   Cached company registry lookup");
    println!("  export <user> [path]                  Export purchases to CSV");
    println!("    --month <YYYY-MM>                   Month to export (default: all)");
    println!("  invoke <function> <METHOD> [body|key=value ...]");
    println!("                                        Call a function handler directly");
    println!("  --help, -h                            Show this help");
    println!("  --version, -V                         Show version");
}

// ── Argument helpers ─────────────────────────────────────────

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn flags<'a>(args: &'a [String], name: &'a str) -> impl Iterator<Item = &'a str> {
    args.windows(2)
        .filter(move |w| w[0] == name)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither `--flags` nor their values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_value = false;
    for arg in args {
        if skip_value {
            skip_value = false;
        } else if arg.starts_with("--") {
            skip_value = true;
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn parse_amount(s: &str) -> Result<Decimal> {
    Decimal::from_str(&s.trim().replace(',', "."))
        .with_context(|| format!("Failed to parse '{s}' as an amount"))
}

fn parse_id(s: &str) -> Result<i64> {
    s.trim()
        .parse()
        .with_context(|| format!("Failed to parse '{s}' as an id"))
}

fn user_arg<'a>(pos: &[&'a str], usage: &str) -> Result<&'a str> {
    pos.first()
        .copied()
        .ok_or_else(|| anyhow::anyhow!("Usage: barganha {usage}"))
}

// ── Commands ─────────────────────────────────────────────────

fn cli_record(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let [user, amount, category, ..] = pos.as_slice() else {
        anyhow::bail!("Usage: barganha record <user> <amount> <category> [--date D] [--market M] [--desc D]");
    };

    let draft = PurchaseRecordDraft {
        user_id: Some(user.to_string()),
        amount: Some(parse_amount(amount)?),
        category: Some(category.to_string()),
        purchase_date: flag(args, "--date").map(str::to_string),
        market: flag(args, "--market").map(str::to_string),
        description: flag(args, "--desc").map(str::to_string),
        source: Some("cli".into()),
    };
    let record = service::insert_purchase_record(db, draft)?;
    println!(
        "Recorded {} in {} on {} (id {})",
        format_brl(record.amount),
        record.category,
        record.purchase_date,
        record.id.unwrap_or_default()
    );
    Ok(())
}

fn cli_budget(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let [user, category, limit, ..] = pos.as_slice() else {
        anyhow::bail!("Usage: barganha budget <user> <category> <limit> [--month YYYY-MM]");
    };

    let draft = BudgetDraft {
        user_id: Some(user.to_string()),
        category: Some(category.to_string()),
        limit: Some(parse_amount(limit)?),
        month: flag(args, "--month").map(str::to_string),
    };
    let budget = service::set_budget(db, draft)?;
    println!(
        "Budget for {} in {}: {}",
        budget.category,
        budget.month,
        format_brl(budget.limit_amount)
    );
    Ok(())
}

fn cli_status(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "status <user> [--month YYYY-MM]")?;
    let statuses = service::budget_status(&*db, user, flag(args, "--month"))?;

    if statuses.is_empty() {
        println!("No budgets");
        return Ok(());
    }

    for status in &statuses {
        println!(
            "{:<16} {} {:>7}  {} / {}",
            truncate(&status.category, 16),
            budget_bar(status.percentage, 20),
            format_percentage(status.percentage),
            format_brl(status.spent),
            format_brl(status.limit),
        );
        if let Some(msg) = status.alert_message() {
            println!("{:<16} {msg}", "");
        }
    }
    Ok(())
}

fn cli_categories(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "categories <user>")?;
    for category in service::purchase_categories(db, user)? {
        println!("{category}");
    }
    Ok(())
}

fn cli_records(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "records <user> [--limit N] [--offset N]")?;
    let limit = match flag(args, "--limit") {
        Some(v) => v.parse().context("--limit must be a number")?,
        None => service::DEFAULT_PAGE_LIMIT,
    };
    let offset = match flag(args, "--offset") {
        Some(v) => v.parse().context("--offset must be a number")?,
        None => 0,
    };

    let records = service::purchase_records(&*db, user, limit, offset)?;
    if records.is_empty() {
        println!("No purchases");
        return Ok(());
    }

    println!("{:<6} {:<12} {:<16} {:>14}  Market", "ID", "Date", "Category", "Amount");
    println!("{}", "─".repeat(64));
    for r in &records {
        println!(
            "{:<6} {:<12} {:<16} {:>14}  {}",
            r.id.unwrap_or_default(),
            r.purchase_date,
            truncate(&r.category, 16),
            format_brl(r.amount),
            r.market.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn cli_summary(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "summary <user> [--month YYYY-MM]")?;
    let month = flag(args, "--month");
    let summary = service::spending_summary(&*db, user, month)?;

    println!("Barganha - {}", month.unwrap_or("all time"));
    println!("{}", "─".repeat(40));
    println!("  Total spent:  {}", format_brl(summary.total_spent));
    println!("  Purchases:    {}", summary.transaction_count);
    println!("  Average:      {}", format_brl(summary.average_transaction));

    if !summary.category_totals.is_empty() {
        println!();
        println!("Spending by Category:");
        for (name, amount) in &summary.category_totals {
            println!("  {:<24} {}", truncate(name, 24), format_brl(*amount));
        }
    }
    Ok(())
}

fn cli_receipt(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let [user, file, ..] = pos.as_slice() else {
        anyhow::bail!("Usage: barganha receipt <user> <file.txt> [--vendor V] [--rule kw=category]");
    };
    let path = shellexpand(file);
    let text = std::fs::read_to_string(Path::new(&path))
        .with_context(|| format!("Failed to read receipt: {path}"))?;

    let mut rules = Vec::new();
    for (name, regex) in [("--rule", false), ("--regex", true)] {
        for rule in flags(args, name) {
            let (pattern, category) = rule
                .rsplit_once('=')
                .ok_or_else(|| anyhow::anyhow!("Rule must look like pattern=category: {rule}"))?;
            rules.push(if regex {
                KeywordRule::regex(pattern, category)
            } else {
                KeywordRule::contains(pattern, category)
            });
        }
    }
    let (categorizer, bad_patterns) = Categorizer::from_rules(&rules);
    if !bad_patterns.is_empty() {
        eprintln!("Warning: invalid regex rule(s): {}", bad_patterns.join(", "));
    }

    // The header is only echoed back. A parseable receipt holds item lines
    // alone, so the header guess never becomes the stored market.
    if let Some(header) = receipt::extract_market_info(&text) {
        if let Some(cnpj) = header.cnpj.as_deref() {
            match header.market_name.as_deref() {
                Some(name) => println!("Receipt CNPJ: {} ({name})", format_cnpj(cnpj)),
                None => println!("Receipt CNPJ: {}", format_cnpj(cnpj)),
            }
        }
    }
    let vendor = flag(args, "--vendor").map(str::to_string);

    let request = ReceiptRequest {
        user_id: Some(user.to_string()),
        vendor,
        text: Some(text),
    };
    match receipt::process_receipt(db, &categorizer, request)? {
        ReceiptOutcome::ManualEntry => {
            println!("Could not read every line of the receipt; enter the purchase manually");
        }
        ReceiptOutcome::Recorded(records) => {
            for r in &records {
                println!(
                    "  {:<16} {:>14}  {}",
                    truncate(&r.category, 16),
                    format_brl(r.amount),
                    r.description.as_deref().unwrap_or("")
                );
            }
            println!("Recorded {} purchase(s)", records.len());
        }
    }
    Ok(())
}

fn cli_market(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let [user, name, ..] = pos.as_slice() else {
        anyhow::bail!("Usage: barganha market <user> <name> [--address A] [--cnpj C]");
    };
    let market = service::create_market(
        db,
        MarketDraft {
            user_id: Some(user.to_string()),
            name: Some(name.to_string()),
            address: flag(args, "--address").map(str::to_string),
            cnpj: flag(args, "--cnpj").map(str::to_string),
        },
    )?;
    println!("Registered {} (id {})", market.name, market.id.unwrap_or_default());
    Ok(())
}

fn cli_markets(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "markets <user>")?;
    let markets = service::list_markets(&*db, user)?;
    if markets.is_empty() {
        println!("No markets");
        return Ok(());
    }

    println!("{:<4} {:<24} {:<20} Address", "ID", "Name", "CNPJ");
    println!("{}", "─".repeat(70));
    for m in &markets {
        println!(
            "{:<4} {:<24} {:<20} {}",
            m.id.unwrap_or_default(),
            truncate(&m.name, 24),
            m.cnpj.as_deref().map(format_cnpj).unwrap_or_default(),
            m.address.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn cli_product(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let [user, name, category, ..] = pos.as_slice() else {
        anyhow::bail!("Usage: barganha product <user> <name> <category> [--price P] [--market-id N]");
    };
    let draft = ProductDraft {
        user_id: Some(user.to_string()),
        name: Some(name.to_string()),
        category: Some(category.to_string()),
        unit: flag(args, "--unit").map(str::to_string),
        price: flag(args, "--price").map(parse_amount).transpose()?,
        barcode: flag(args, "--barcode").map(str::to_string),
        brand: flag(args, "--brand").map(str::to_string),
        market_id: flag(args, "--market-id").map(parse_id).transpose()?,
    };
    let product = service::create_product(db, draft)?;
    println!(
        "Registered {} ({}) {}",
        product.name,
        product.unit,
        product.price.map(format_brl).unwrap_or_default()
    );
    Ok(())
}

fn cli_deals(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "deals <user> [--category C] [--market-id N] [--max-price P]")?;
    let filter = DealFilter {
        category: flag(args, "--category").map(str::to_string),
        market_id: flag(args, "--market-id").map(parse_id).transpose()?,
        max_price: flag(args, "--max-price").map(parse_amount).transpose()?,
    };

    let deals = service::best_deals(&*db, user, &filter)?;
    if deals.is_empty() {
        println!("No priced products");
        return Ok(());
    }

    println!("{:<28} {:>12}  {:<20} Offers", "Product", "Price", "Market");
    println!("{}", "─".repeat(72));
    for d in &deals {
        println!(
            "{:<28} {:>12}  {:<20} {}",
            truncate(&d.name, 28),
            format_brl(d.price),
            truncate(d.market_name.as_deref().unwrap_or("-"), 20),
            d.offers
        );
    }
    Ok(())
}

fn cli_company(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let cnpj = user_arg(&pos, "company <cnpj> [--from file.json]")?;
    let from = flag(args, "--from").map(shellexpand);

    let data = service::lookup_company(db, cnpj, chrono::Utc::now(), |digits| {
        let Some(path) = from.as_deref() else {
            anyhow::bail!("No cached registry data for {digits}; supply it with --from <file.json>");
        };
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        serde_json::from_str(&raw).with_context(|| format!("{path} is not valid JSON"))
    })?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn cli_export(args: &[String], db: &mut Database) -> Result<()> {
    let pos = positionals(args);
    let user = user_arg(&pos, "export <user> [path] [--month YYYY-MM]")?;
    let month = flag(args, "--month");

    let output_path = pos.get(1).map(|p| shellexpand(p)).unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/barganha-export-{}.csv", month.unwrap_or("all"))
    });

    let records = db.get_purchase_records_for_export(user, month)?;
    if records.is_empty() {
        println!("No purchases to export");
        return Ok(());
    }

    let mut wtr = csv::Writer::from_path(&output_path)
        .with_context(|| format!("Failed to create {output_path}"))?;
    wtr.write_record(["id", "date", "category", "amount", "market", "description", "source"])?;
    for r in &records {
        let id = r.id.unwrap_or_default().to_string();
        let amount = r.amount.to_string();
        wtr.write_record([
            id.as_str(),
            r.purchase_date.as_str(),
            r.category.as_str(),
            amount.as_str(),
            r.market.as_deref().unwrap_or(""),
            r.description.as_deref().unwrap_or(""),
            r.source.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    println!("Exported {} purchases to {output_path}", records.len());
    Ok(())
}

fn cli_invoke(args: &[String], db: &mut Database) -> Result<()> {
    let [name, method, rest @ ..] = args else {
        anyhow::bail!("Usage: barganha invoke <function> <METHOD> [body|key=value ...]");
    };

    let method = Method::from(method.as_str());
    let mut req = if method == Method::Post {
        Request::post(rest.join(" "))
    } else {
        let mut req = Request::get();
        for pair in rest {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Query parameters must look like key=value: {pair}"))?;
            req = req.with_query(key, value);
        }
        req
    };
    req.method = method;

    let resp = functions::dispatch(db, name, &req);
    println!("{}", resp.status);
    println!("{}", resp.body);
    if resp.status >= 400 {
        anyhow::bail!("{name} returned {}", resp.status);
    }
    Ok(())
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
