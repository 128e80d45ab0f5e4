use erp_gateway::infra::config::GatewayConfig;
use erp_gateway::{DefinitionRegistry, PostgresExecutionLogStore};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--strict]\n\
         \n\
         Checks configuration, parses every interface definition and, when\n\
         DATABASE_URL is set, verifies the execution log database.\n\
         \n\
         --strict   fail on skipped documents and definition warnings\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let strict = args.iter().any(|a| a == "--strict");

    let config = GatewayConfig::from_env()?;

    println!("> Preflight:");
    println!("  BIND_ADDR={}", config.bind_addr);
    println!("  DEFINITIONS_DIR={}", config.definitions_dir.display());
    println!("  WATCH_DEFINITIONS={}", config.watch_definitions);
    println!(
        "  RPC_BACKEND_URL={}",
        config.rpc_backend_url.as_deref().unwrap_or("(unset: mock executor)")
    );
    println!("  RPC_TIMEOUT_MS={}", config.rpc_timeout.as_millis());
    println!("  SIZE_POLICY={}", config.size_policy);

    // Definitions
    let registry = DefinitionRegistry::open(&config.definitions_dir)?;
    let snapshot = registry.snapshot();
    println!("  Definitions loaded: {}", snapshot.len());
    println!("  Fingerprint: {}", snapshot.fingerprint());

    let mut problems = 0usize;
    for skipped in snapshot.skipped() {
        problems += 1;
        eprintln!("  Skipped {}: {}", skipped.file, skipped.reason);
    }
    for id in snapshot.ids() {
        let Some(definition) = snapshot.get(&id) else { continue };
        let issues = definition.lint();
        if issues.is_empty() {
            println!("  {} -> {} ok", definition.id, definition.call_target);
        }
        for issue in issues {
            problems += 1;
            eprintln!("  Warning: {} {}: {}", definition.id, issue.rule, issue.message);
        }
    }

    // Execution log database
    match &config.database_url {
        Some(url) => {
            let store = PostgresExecutionLogStore::connect(url).await?;
            store.ping().await?;
            println!("  Execution log database reachable; proxy_execution_log ready.");
        }
        None => println!(
            "  DATABASE_URL unset: the last {} execution logs stay in memory.",
            config.audit_memory_capacity
        ),
    }

    if strict && problems > 0 {
        return Err(anyhow::anyhow!("{} definition problem(s) found", problems));
    }

    println!("> Preflight OK.");
    Ok(())
}
