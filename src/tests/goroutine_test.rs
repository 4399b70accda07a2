#[cfg(test)]
mod tests {
    use crate::goroutine::decl::GoDecl;
    use crate::goroutine::{GoroutineInfo, GoroutinePeer, StackUpdate};

    fn full_frame(ts: u64, stacks: Vec<StackUpdate>, decls: Vec<GoDecl>) -> GoroutineInfo {
        GoroutineInfo {
            ts,
            delta: false,
            stacks,
            decls,
        }
    }

    fn delta_frame(ts: u64, stacks: Vec<StackUpdate>, decls: Vec<GoDecl>) -> GoroutineInfo {
        GoroutineInfo {
            ts,
            delta: true,
            stacks,
            decls,
        }
    }

    fn stack(go_id: u64, state: &str, trace: &str) -> StackUpdate {
        StackUpdate {
            go_id,
            state: Some(state.to_string()),
            stack_trace: Some(trace.to_string()),
            name: None,
            tags: None,
            same: Some(false),
            ts: None,
        }
    }

    fn same_stack(go_id: u64) -> StackUpdate {
        StackUpdate {
            go_id,
            state: None,
            stack_trace: None,
            name: None,
            tags: None,
            same: Some(true),
            ts: None,
        }
    }

    #[tokio::test]
    async fn s4_goroutine_delta_replays_same_and_updates() {
        let peer = GoroutinePeer::new(600, 600);

        peer.process_goroutine_info(full_frame(
            100,
            vec![stack(1, "running", "goroutine 1 [running]:\nA")],
            vec![],
        ))
        .await
        .unwrap();

        peer.process_goroutine_info(delta_frame(200, vec![same_stack(1)], vec![]))
            .await
            .unwrap();

        let at_200 = peer.goroutines_at(200, false).await.unwrap();
        let g = at_200.goroutines.iter().find(|g| g.go_id == 1).unwrap();
        assert_eq!(g.primary_state, "running");

        peer.process_goroutine_info(full_frame(
            300,
            vec![stack(1, "chan receive", "goroutine 1 [chan receive]:\nB")],
            vec![],
        ))
        .await
        .unwrap();

        let at_300 = peer.goroutines_at(300, false).await.unwrap();
        let g = at_300.goroutines.iter().find(|g| g.go_id == 1).unwrap();
        assert_eq!(g.primary_state, "chan receive");
    }

    #[tokio::test]
    async fn ip3_logical_indices_are_dense_per_append() {
        let peer = GoroutinePeer::new(600, 600);
        for (i, ts) in [100u64, 200, 300].into_iter().enumerate() {
            peer.process_goroutine_info(full_frame(ts, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
                .await
                .unwrap();
            let spans = peer.time_spans_since(0).await.unwrap();
            assert_eq!(spans.last_tick, i as u64);
        }
    }

    #[tokio::test]
    async fn ip4_delta_before_any_full_frame_is_dropped() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(delta_frame(100, vec![same_stack(1)], vec![]))
            .await
            .unwrap();
        let counts = peer.goroutine_counts().await;
        assert_eq!(counts.total, 0);
    }

    #[tokio::test]
    async fn ip5_out_of_order_timestamp_is_dropped_not_applied() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(full_frame(200, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
            .await
            .unwrap();
        peer.process_goroutine_info(full_frame(100, vec![stack(2, "running", "goroutine 2 [running]:\nA")], vec![]))
            .await
            .unwrap();
        let counts = peer.goroutine_counts().await;
        // go-id 2's out-of-order frame was dropped outright.
        assert_eq!(counts.total, 1);
    }

    #[tokio::test]
    async fn rt2_repeated_no_change_deltas_are_idempotent() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(full_frame(100, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
            .await
            .unwrap();

        for ts in [200u64, 300, 400] {
            peer.process_goroutine_info(delta_frame(ts, vec![same_stack(1)], vec![]))
                .await
                .unwrap();
        }

        let at_400 = peer.goroutines_at(400, false).await.unwrap();
        let g = at_400.goroutines.iter().find(|g| g.go_id == 1).unwrap();
        assert_eq!(g.primary_state, "running");
        assert_eq!(g.frames.len(), 0);
    }

    #[tokio::test]
    async fn s5_goroutine_disappearance_marks_end_inexact() {
        let peer = GoroutinePeer::new(600, 600);
        for ts in [100u64, 200, 300] {
            peer.process_goroutine_info(full_frame(ts, vec![stack(7, "running", "goroutine 7 [running]:\nA")], vec![]))
                .await
                .unwrap();
        }
        // Frame 4: goroutine 7 is absent.
        peer.process_goroutine_info(full_frame(400, vec![stack(8, "running", "goroutine 8 [running]:\nA")], vec![]))
            .await
            .unwrap();

        let spans = peer.time_spans_since(0).await.unwrap();
        let (_, span7) = spans
            .changed_spans
            .iter()
            .find(|(id, _)| *id == 7)
            .expect("goroutine 7 span should be tracked");
        assert!(!span7.is_alive());
        assert_eq!(span7.end_ts, 400);
        assert!(!span7.end_exact);
    }

    #[tokio::test]
    async fn decl_start_ts_is_clamped_to_first_aligner_timestamp() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(full_frame(
            100,
            vec![stack(1, "running", "goroutine 1 [running]:\nA")],
            vec![GoDecl {
                go_id: 1,
                parent_go_id: None,
                start_ts: Some(10),
                end_ts: None,
                real_created_by: None,
                pkg: None,
                name: None,
                tags: None,
                spawn_count: None,
            }],
        ))
        .await
        .unwrap();

        let spans = peer.time_spans_since(0).await.unwrap();
        let (_, span) = spans.changed_spans.iter().find(|(id, _)| *id == 1).unwrap();
        assert_eq!(span.start_ts, 100);
        assert!(span.start_exact);
    }

    #[tokio::test]
    async fn goroutines_at_zero_uses_latest_tick() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(full_frame(100, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
            .await
            .unwrap();
        peer.process_goroutine_info(full_frame(200, vec![stack(1, "chan receive", "goroutine 1 [chan receive]:\nB")], vec![]))
            .await
            .unwrap();

        let result = peer.goroutines_at(0, false).await.unwrap();
        assert_eq!(result.effective_ts, 200);
        let g = result.goroutines.iter().find(|g| g.go_id == 1).unwrap();
        assert_eq!(g.primary_state, "chan receive");
    }

    #[tokio::test]
    async fn active_only_excludes_ended_goroutines_after_their_end_tick() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(full_frame(100, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
            .await
            .unwrap();
        // go-id 1 is absent from here on; its span ends at ts=200.
        peer.process_goroutine_info(full_frame(200, vec![], vec![]))
            .await
            .unwrap();
        peer.process_goroutine_info(full_frame(300, vec![], vec![]))
            .await
            .unwrap();

        // The end tick itself is still within the (inclusive) span.
        let at_end = peer.goroutines_at(200, true).await.unwrap();
        assert_eq!(at_end.total_count, 1);

        // Strictly after the end tick, it's excluded from an active-only query.
        let after_end = peer.goroutines_at(300, true).await.unwrap();
        assert_eq!(after_end.total_count, 0);
        let all_after_end = peer.goroutines_at(300, false).await.unwrap();
        assert_eq!(all_after_end.total_count, 1);
    }

    #[tokio::test]
    async fn goroutines_by_ids_returns_inactive_placeholder_for_unknown_id() {
        let peer = GoroutinePeer::new(600, 600);
        peer.process_goroutine_info(full_frame(100, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
            .await
            .unwrap();

        let result = peer.goroutines_by_ids(&[1, 999], 0).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].go_id, 1);
        assert_eq!(result[1].go_id, 999);
        assert_eq!(result[1].primary_state, "inactive");
    }

    #[tokio::test]
    async fn prune_removes_goroutines_inactive_past_the_threshold() {
        let peer = GoroutinePeer::new(600, 2);
        peer.process_goroutine_info(full_frame(100, vec![stack(1, "running", "goroutine 1 [running]:\nA")], vec![]))
            .await
            .unwrap();
        // Three further full frames with no mention of go-id 1 pushes its
        // last-active-iteration past the prune threshold of 2.
        for ts in [200u64, 300, 400] {
            peer.process_goroutine_info(full_frame(ts, vec![stack(2, "running", "goroutine 2 [running]:\nA")], vec![]))
                .await
                .unwrap();
        }

        let result = peer.goroutines_by_ids(&[1], 0).await.unwrap();
        assert_eq!(result[0].primary_state, "inactive");
    }
}
