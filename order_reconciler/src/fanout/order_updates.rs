use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::OrderId,
    jobs::{JobQueue, MessageBroker, QueueConfig},
};

pub const ORDER_UPDATES_BY_ID_QUEUE: &str = "order-updates-by-id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdateTrigger {
    pub kind: String,
}

impl OrderUpdateTrigger {
    pub fn is_revalidation(&self) -> bool {
        self.kind == "revalidation"
    }
}

/// Tells the order-update consumers that an order's stored status changed, so that caches derived from it are
/// invalidated. The context string is fresh for every transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdateNotice {
    pub context: String,
    pub id: OrderId,
    pub trigger: OrderUpdateTrigger,
}

impl OrderUpdateNotice {
    pub fn revalidation(id: &OrderId) -> Self {
        Self {
            context: format!("revalidation-{}-{:08x}-{id}", Utc::now().timestamp_millis(), rand::random::<u32>()),
            id: id.clone(),
            trigger: OrderUpdateTrigger { kind: "revalidation".to_string() },
        }
    }
}

pub fn order_updates_queue<B: MessageBroker>(broker: B) -> JobQueue<OrderUpdateNotice, B> {
    JobQueue::new(QueueConfig::new(ORDER_UPDATES_BY_ID_QUEUE), broker)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn revalidation_notice_shape() {
        let notice = OrderUpdateNotice::revalidation(&OrderId::from("0xabc"));
        assert!(notice.context.starts_with("revalidation-"));
        assert!(notice.context.ends_with("-0xabc"));
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["id"], "0xabc");
        assert_eq!(json["trigger"]["kind"], "revalidation");
    }
}
