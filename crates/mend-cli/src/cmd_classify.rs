use mend_risk::should_allow_modification;

pub fn execute(paths: &[String], json: bool) -> anyhow::Result<()> {
    for path in paths {
        let decision = should_allow_modification(path);
        if json {
            println!("{}", serde_json::to_string(&decision)?);
        } else {
            let gate = if decision.allowed {
                format!("allowed ({})", decision.fix_strategy)
            } else {
                "blocked".to_string()
            };
            println!("{path}: {} / {} [{gate}]", decision.category, decision.tier);
            if let Some(reason) = &decision.block_reason {
                println!("  {reason}");
            }
        }
    }
    Ok(())
}
