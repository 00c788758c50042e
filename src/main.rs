use anyhow::Result;
use catalog_evaluator::orchestrator::App;
use catalog_evaluator::utils::logging;
use catalog_evaluator::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
