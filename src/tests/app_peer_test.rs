#[cfg(test)]
mod tests {
    use crate::app_peer::{AppInfo, AppPeer, AppStatus, Packet};
    use crate::ids::AppRunId;
    use std::collections::HashMap;

    fn new_peer() -> AppPeer {
        AppPeer::new(AppRunId::from("run-1"), 100, 600, 600, 600)
    }

    #[tokio::test]
    async fn starts_running_with_zero_last_mod_time_unset() {
        let peer = new_peer();
        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.status, AppStatus::Running);
        assert!(info.running);
        assert!(info.app_info.is_none());
    }

    #[tokio::test]
    async fn app_info_packet_is_reflected_in_app_run_info() {
        let peer = new_peer();
        peer.handle_packet(Packet::AppInfo(AppInfo {
            app_name: "myapp".to_string(),
            start_time: 123,
            executable: "/bin/myapp".to_string(),
            module_name: "github.com/example/myapp".to_string(),
            build_info: Default::default(),
        }))
        .await
        .unwrap();

        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.app_info.unwrap().app_name, "myapp");
    }

    #[tokio::test]
    async fn app_done_is_terminal_and_survives_ref_release() {
        let peer = new_peer();
        peer.acquire_ref().await.unwrap();
        peer.handle_packet(Packet::AppDone).await.unwrap();
        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.status, AppStatus::Done);

        // Releasing the last ref must not downgrade Done to Disconnected.
        peer.release_ref().await.unwrap();
        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.status, AppStatus::Done);
    }

    #[tokio::test]
    async fn ref_count_reaching_zero_marks_disconnected() {
        let peer = new_peer();
        peer.acquire_ref().await.unwrap();
        peer.release_ref().await.unwrap();
        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.status, AppStatus::Disconnected);
        assert!(!info.running);
    }

    #[tokio::test]
    async fn new_packet_revives_a_disconnected_peer() {
        let peer = new_peer();
        peer.acquire_ref().await.unwrap();
        peer.release_ref().await.unwrap();
        assert_eq!(peer.app_run_info().await.unwrap().status, AppStatus::Disconnected);

        peer.acquire_ref().await.unwrap();
        assert_eq!(peer.app_run_info().await.unwrap().status, AppStatus::Running);
    }

    #[tokio::test]
    async fn log_packet_increments_log_count_and_bumps_last_mod_time() {
        let peer = new_peer();
        let before = peer.last_mod_time().await;
        peer.handle_packet(Packet::Log {
            source: "/dev/stdout".to_string(),
            message: "hello".to_string(),
            fields: HashMap::new(),
            tags: vec![],
            timestamp_ms: 1,
        })
        .await
        .unwrap();

        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.log_count, 1);
        assert!(peer.last_mod_time().await >= before);
    }

    #[tokio::test]
    async fn app_run_info_projects_goroutine_counts() {
        use crate::goroutine::{GoroutineInfo, StackUpdate};

        let peer = new_peer();
        peer.handle_packet(Packet::Goroutine(GoroutineInfo {
            ts: 100,
            delta: false,
            stacks: vec![StackUpdate {
                go_id: 1,
                state: Some("running".to_string()),
                stack_trace: Some("goroutine 1 [running]:\nA".to_string()),
                name: None,
                tags: None,
                same: Some(false),
                ts: None,
            }],
            decls: vec![],
        }))
        .await
        .unwrap();

        let info = peer.app_run_info().await.unwrap();
        assert_eq!(info.goroutine_active_count, 1);
        assert_eq!(info.goroutine_total_count, 1);
    }
}
