//! Property-based tests for the chunked upload buffer.

use std::sync::Arc;

use blobdisk_shared::RemoteObjectId;
use proptest::prelude::*;

use crate::disk::upload::BlockUploadBuffer;
use crate::storage::InMemoryContainer;

const BLOB: &str = "props/data.bin_Xy12Zw34";

/// Strategy for a payload written as a sequence of write calls.
fn arb_writes() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..12)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn upload(
    writes: &[Vec<u8>],
    max_part: usize,
    buffer_size: usize,
) -> (Arc<InMemoryContainer>, u64) {
    let container = Arc::new(InMemoryContainer::new());
    let mut buffer = BlockUploadBuffer::new(
        Arc::clone(&container),
        RemoteObjectId::from(BLOB),
        max_part,
        buffer_size,
    );
    let size = runtime().block_on(async {
        for chunk in writes {
            buffer.write(chunk).await.expect("write");
        }
        buffer.finalize().await.expect("finalize")
    });
    (container, size)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    // Round-trip: the committed blob is the concatenation of every write.
    #[test]
    fn prop_committed_blob_equals_input(
        writes in arb_writes(),
        max_part in 1usize..64,
        buffer_size in 1usize..96,
    ) {
        let (container, size) = upload(&writes, max_part, buffer_size);
        let expected: Vec<u8> = writes.concat();

        prop_assert_eq!(size, expected.len() as u64);
        let blob = container.get(BLOB).expect("committed");
        prop_assert_eq!(blob.as_ref(), expected.as_slice());
    }

    // Part-size bound: every block fits the limit, only the last may be
    // short, and the count is ceil(total / max_part).
    #[test]
    fn prop_blocks_bounded_and_minimal(
        writes in arb_writes(),
        max_part in 1usize..64,
        buffer_size in 1usize..96,
    ) {
        let (container, _) = upload(&writes, max_part, buffer_size);
        let total: usize = writes.iter().map(Vec::len).sum();
        let lens: Vec<usize> = container.stage_calls().iter().map(|s| s.len).collect();

        prop_assert_eq!(lens.len(), total.div_ceil(max_part));
        prop_assert!(lens.iter().all(|&len| len > 0 && len <= max_part));
        if let Some((_, init)) = lens.split_last() {
            prop_assert!(init.iter().all(|&len| len == max_part));
        }
    }

    // Commit order equals staging order, and there is exactly one commit.
    #[test]
    fn prop_single_commit_in_stage_order(
        writes in arb_writes(),
        max_part in 1usize..64,
        buffer_size in 1usize..96,
    ) {
        let (container, _) = upload(&writes, max_part, buffer_size);
        let commits = container.commit_calls();
        prop_assert_eq!(commits.len(), 1);

        let staged: Vec<_> = container.stage_calls().into_iter().map(|s| s.block_id).collect();
        prop_assert_eq!(&commits[0].block_ids, &staged);
    }
}
