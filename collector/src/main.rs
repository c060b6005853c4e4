use anyhow::Context;
use collector_core::engine::Collector;
use collector_core::Distribution;

fn main() -> anyhow::Result<()> {
  let args: Vec<String> = std::env::args().collect();

  let dist = Distribution {
    build: collector::build_info(),
    components: collector::components,
    engine: Box::new(Collector),
  };

  collector_core::run(dist, &args).context("collector run")
}
