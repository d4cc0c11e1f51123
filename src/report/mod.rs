// Git report — repository listing enriched with per-repository commit counts
// through a batched concurrent fanout.

pub mod enrich;
pub mod github;
pub mod model;
