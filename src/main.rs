use clap::Parser;
use scope3_quote::core::breakdown::{category_breakdown, task_summary, BreakdownOrder};
use scope3_quote::core::export::{format_yen, group_count_label};
use scope3_quote::utils::error::{ErrorSeverity, QuoteError};
use scope3_quote::utils::{logger, validation::Validate};
use scope3_quote::{
    CliConfig, LocalStorage, QuoteConfig, QuoteEngine, QuoteOutcome, QuotePipeline, QuoteReport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting scope3-quote CLI");
    tracing::debug!("CLI config: {:?}", cli);

    let mut config = match QuoteConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => config_failure(&e),
    };
    config.apply_overrides(cli.catalog_dir.clone(), cli.output_path.clone());

    // 驗證配置
    if let Err(e) = config.validate() {
        config_failure(&e);
    }

    let strict_catalog = cli.strict_catalog || config.catalog.strict;
    let hourly_rate = config.engagement.hourly_rate;

    // 設定檔中的路徑相對於目前目錄
    let storage = LocalStorage::new("");
    let pipeline = QuotePipeline::new(storage, config).with_strict_catalog(strict_catalog);
    let engine = QuoteEngine::new(pipeline);

    let result = if cli.dry_run {
        engine.preview().await
    } else {
        engine.run().await
    };

    match result {
        Ok(report) => {
            if cli.json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report, hourly_rate, cli.dry_run);
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Quote failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn config_failure(e: &QuoteError) -> ! {
    tracing::error!("❌ Configuration validation failed: {}", e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(1);
}

fn print_report(report: &QuoteReport, hourly_rate: u64, dry_run: bool) {
    for warning in &report.warnings {
        println!("⚠️ {}", warning);
    }

    match &report.outcome {
        QuoteOutcome::Priced(result) => {
            println!(
                "🧮 Total hours: {:.1}h (adjusted {:.1}h, scale x {}, group x {})",
                result.total_base_hours,
                result.adjusted_hours,
                result.scale_multiplier,
                result.group_multiplier
            );
            println!(
                "💴 Net: {}  Incl. tax: {}",
                format_yen(result.net_price_truncated()),
                format_yen(result.tax_price_truncated())
            );

            println!("📊 Breakdown:");
            for total in category_breakdown(result, hourly_rate, BreakdownOrder::Price) {
                println!(
                    "  {:<8} {:>7.1}h {:>14} {:>5.1}%",
                    total.label,
                    total.hours,
                    format_yen(total.price as u64),
                    total.share_percent
                );
            }

            println!("📝 Selected tasks:");
            for (category, tasks) in task_summary(result) {
                println!("  {}", category);
                for task in tasks {
                    println!("    - {}", task);
                }
            }
        }
        QuoteOutcome::RequiresManualQuote {
            group_company_count,
        } => {
            println!(
                "🧑‍💼 Group companies: {}. This engagement needs an individual quote, no price is available.",
                group_count_label(*group_company_count)
            );
        }
    }

    match &report.output_path {
        Some(path) => println!("📁 Report saved to: {}", path),
        None if dry_run => println!("🔎 Dry run, no report written"),
        None => {}
    }
}
