pub mod aggregator;
pub mod distribution;
pub mod error;
pub mod extractor;
pub mod pipeline;
pub mod provider;
pub mod scorer;
pub mod stabilizer;
pub mod subject;

#[cfg(test)]
pub(crate) mod testing;
