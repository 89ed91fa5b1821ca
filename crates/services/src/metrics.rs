use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct BoardLabels {
    pub board: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EvictionLabels {
    pub board: String,
    /// `archived` or `deleted`
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RejectionLabels {
    pub board: String,
    pub kind: String,
}

/// Engine counters. Handles are cheap clones of the same series.
#[derive(Clone, Debug, Default)]
pub struct EngineMetrics {
    pub threads_created: Family<BoardLabels, Counter>,
    pub posts_created: Family<BoardLabels, Counter>,
    pub posts_deleted: Family<BoardLabels, Counter>,
    pub evictions: Family<EvictionLabels, Counter>,
    pub rejections: Family<RejectionLabels, Counter>,
    pub ddos_blocks: Counter,
}

impl EngineMetrics {
    pub fn register(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        let board = registry.sub_registry_with_prefix("board");
        board.register("threads_created", "Threads created", metrics.threads_created.clone());
        board.register("posts_created", "Posts created, OPs included", metrics.posts_created.clone());
        board.register("posts_deleted", "Posts removed by deletion or eviction", metrics.posts_deleted.clone());
        board.register("evictions", "Threads evicted to honour the thread limit", metrics.evictions.clone());
        board.register("rejections", "Refused actions by error kind", metrics.rejections.clone());
        board.register("ddos_blocks", "Requests refused by the abuse throttle", metrics.ddos_blocks.clone());
        metrics
    }

    pub fn created(&self, board: &str, thread: bool) {
        let labels = BoardLabels { board: board.to_string() };
        if thread {
            self.threads_created.get_or_create(&labels).inc();
        }
        self.posts_created.get_or_create(&labels).inc();
    }

    pub fn deleted(&self, board: &str, count: usize) {
        self.posts_deleted
            .get_or_create(&BoardLabels { board: board.to_string() })
            .inc_by(count as u64);
    }

    pub fn evicted(&self, board: &str, archived: bool) {
        let outcome = if archived { "archived" } else { "deleted" };
        self.evictions
            .get_or_create(&EvictionLabels { board: board.to_string(), outcome: outcome.to_string() })
            .inc();
    }

    pub fn rejected(&self, board: &str, kind: &str) {
        self.rejections
            .get_or_create(&RejectionLabels { board: board.to_string(), kind: kind.to_string() })
            .inc();
    }
}
