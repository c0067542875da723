use std::fmt::Debug;

use log::info;

use crate::core::item::{BatchSink, BatchSinkResult};

/// A sink that logs every record it receives, useful while developing a transform.
#[derive(Default)]
pub struct LoggerSink {}

impl<T> BatchSink<T> for LoggerSink
where
    T: Debug,
{
    fn on_batch(&self, batch: &[T]) -> BatchSinkResult {
        batch.iter().for_each(|record| info!("Record:{:?}", record));
        Ok(())
    }

    fn on_complete(&self, total_records: usize, total_batches: usize) -> BatchSinkResult {
        info!("Records: {}, batches: {}", total_records, total_batches);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_call_succeeds() {
        let _ = env_logger::builder().is_test(true).try_init();
        let sink = LoggerSink::default();

        assert!(BatchSink::<&str>::on_batch(&sink, &["first", "second"]).is_ok());
        assert!(BatchSink::<&str>::on_complete(&sink, 2, 1).is_ok());
    }
}
