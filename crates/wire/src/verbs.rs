//! Wire protocol verbs. Every verb is a distinct `i64` written as
//! the first frame after the job-identity handshake.

/// A 64-bit protocol verb. The numeric assignment is arbitrary; only
/// distinctness and stability within a deployment matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    SendTask,
    SendMore,
    SendFull,
    SendRjct,
    SendHeart,
    ReadResult,
    ReadEmpty,
    Terminate,
    QueryState,
    QueryMetricsList,
    QueryMetricsLast,
    QueryMetricsHistory,
    NodesAppend,
    NodesList,
    NodesRemove,
    ResModuleError,
    ResModuleNoAns,
    ResModuleCtxEr,
}

impl Verb {
    pub const fn code(self) -> i64 {
        match self {
            Verb::SendTask => 1,
            Verb::SendMore => 2,
            Verb::SendFull => 3,
            Verb::SendRjct => 4,
            Verb::SendHeart => 5,
            Verb::ReadResult => 6,
            Verb::ReadEmpty => 7,
            Verb::Terminate => 8,
            Verb::QueryState => 9,
            Verb::QueryMetricsList => 10,
            Verb::QueryMetricsLast => 11,
            Verb::QueryMetricsHistory => 12,
            Verb::NodesAppend => 13,
            Verb::NodesList => 14,
            Verb::NodesRemove => 15,
            Verb::ResModuleError => 16,
            Verb::ResModuleNoAns => 17,
            Verb::ResModuleCtxEr => 18,
        }
    }

    pub const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
                1 => Verb::SendTask,
                2 => Verb::SendMore,
                3 => Verb::SendFull,
                4 => Verb::SendRjct,
                5 => Verb::SendHeart,
                6 => Verb::ReadResult,
                7 => Verb::ReadEmpty,
                8 => Verb::Terminate,
                9 => Verb::QueryState,
                10 => Verb::QueryMetricsList,
                11 => Verb::QueryMetricsLast,
                12 => Verb::QueryMetricsHistory,
                13 => Verb::NodesAppend,
                14 => Verb::NodesList,
                15 => Verb::NodesRemove,
                16 => Verb::ResModuleError,
                17 => Verb::ResModuleNoAns,
                18 => Verb::ResModuleCtxEr,
                _ => return None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_verb() {
        let all = [
            Verb::SendTask,
            Verb::SendMore,
            Verb::SendFull,
            Verb::SendRjct,
            Verb::SendHeart,
            Verb::ReadResult,
            Verb::ReadEmpty,
            Verb::Terminate,
            Verb::QueryState,
            Verb::QueryMetricsList,
            Verb::QueryMetricsLast,
            Verb::QueryMetricsHistory,
            Verb::NodesAppend,
            Verb::NodesList,
            Verb::NodesRemove,
            Verb::ResModuleError,
            Verb::ResModuleNoAns,
            Verb::ResModuleCtxEr,
        ];
        for v in all {
            assert_eq!(Verb::from_code(v.code()), Some(v));
        }
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(Verb::from_code(999), None);
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            Verb::SendTask.code(),
            Verb::SendMore.code(),
            Verb::SendFull.code(),
            Verb::SendRjct.code(),
            Verb::SendHeart.code(),
            Verb::ReadResult.code(),
            Verb::ReadEmpty.code(),
            Verb::Terminate.code(),
            Verb::QueryState.code(),
            Verb::QueryMetricsList.code(),
            Verb::QueryMetricsLast.code(),
            Verb::QueryMetricsHistory.code(),
            Verb::NodesAppend.code(),
            Verb::NodesList.code(),
            Verb::NodesRemove.code(),
            Verb::ResModuleError.code(),
            Verb::ResModuleNoAns.code(),
            Verb::ResModuleCtxEr.code(),
        ];
        let mut sorted = all.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), all.len());
    }
}
