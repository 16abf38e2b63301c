// Pipeline stages, in run order. Each stage discovers its inputs by file name,
// transforms them and writes new artifacts; nothing is shared in memory.

pub mod capture; // search API -> raw captures
pub mod normalize; // raw captures -> processed tables
pub mod enrich; // processed tables -> enriched tables
pub mod analyze; // enriched tables -> rankings and plots
