//! In-memory map target
//!
//! A `RwLock<HashMap>` shared by every task; each task gets its own thread.
//! Read runs load every key during `init` so lookups hit.

use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::benchmark::{Benchmark, PerfTask, TaskContext, TaskRange};

type Store = Arc<RwLock<HashMap<u32, u64>>>;

pub struct MemoryMapBenchmark {
    store: Store,
}

impl MemoryMapBenchmark {
    pub const NAME: &'static str = "MemoryMapBenchmark";

    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }
}

impl Default for MemoryMapBenchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl Benchmark for MemoryMapBenchmark {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self, ctx: &TaskContext) -> anyhow::Result<()> {
        let row_count = ctx.config().row_count;
        if !ctx.config().is_write() {
            let mut store = self.store.write();
            store.reserve(row_count);
            for key in 1..=row_count as u32 {
                store.insert(key, u64::from(key));
            }
            info!("Loaded {} rows for read benchmark", row_count);
        }
        Ok(())
    }

    fn destroy(&mut self) -> anyhow::Result<()> {
        self.store.write().clear();
        Ok(())
    }

    fn create_task(
        &mut self,
        range: &TaskRange,
        ctx: &TaskContext,
    ) -> anyhow::Result<Arc<dyn PerfTask>> {
        Ok(Arc::new(MapTask {
            range: range.clone(),
            ctx: ctx.clone(),
            store: Arc::clone(&self.store),
        }))
    }
}

struct MapTask {
    range: TaskRange,
    ctx: TaskContext,
    store: Store,
}

impl PerfTask for MapTask {
    fn start_perf_test(&self) -> anyhow::Result<()> {
        let write = self.ctx.config().is_write();
        for idx in self.range.rows() {
            let key = self.ctx.key_for(idx);
            if write {
                self.store.write().insert(key, idx as u64);
            } else {
                black_box(self.store.read().get(&key).copied());
            }
            self.ctx.notify_operation_complete();
        }
        Ok(())
    }
}
