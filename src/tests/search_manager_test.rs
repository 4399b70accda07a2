#[cfg(test)]
mod tests {
    use crate::ring::CircularBuffer;
    use crate::search::matcher::MatchContext;
    use crate::search::manager::SearchManager;

    #[derive(Clone)]
    struct Line(String);

    impl MatchContext for Line {
        fn text(&self) -> &str {
            &self.0
        }
        fn field_text(&self, _field: &str) -> Option<&str> {
            None
        }
        fn field_numeric(&self, _field: &str) -> Option<f64> {
            None
        }
        fn tags(&self) -> &[String] {
            &[]
        }
        fn is_marked(&self) -> bool {
            false
        }
        fn is_user_query(&self) -> bool {
            false
        }
    }

    fn ring_of(n: u64) -> CircularBuffer<Line> {
        let mut ring = CircularBuffer::new(1000);
        for i in 0..n {
            ring.write_at(i, Line(format!("line {i}")));
        }
        ring
    }

    #[tokio::test]
    async fn page_selects_page_number_times_page_size_window() {
        let ring = ring_of(250);
        let manager: SearchManager<Line> = SearchManager::subscribe("", &ring);

        let page0 = manager.page(0, 100).await.unwrap();
        assert_eq!(page0.len(), 100);
        assert_eq!(page0[0].0, "line 0");

        let page1 = manager.page(1, 100).await.unwrap();
        assert_eq!(page1.len(), 100);
        assert_eq!(page1[0].0, "line 100");
        assert_eq!(page1.last().unwrap().0, "line 199");

        let page2 = manager.page(2, 100).await.unwrap();
        assert_eq!(page2.len(), 50);
        assert_eq!(page2[0].0, "line 200");
    }

    #[tokio::test]
    async fn negative_page_minus_one_is_the_last_page() {
        let ring = ring_of(250);
        let manager: SearchManager<Line> = SearchManager::subscribe("", &ring);

        let last = manager.page(-1, 100).await.unwrap();
        let page2 = manager.page(2, 100).await.unwrap();
        assert_eq!(last, page2);
        assert_eq!(last.len(), 50);
    }

    #[tokio::test]
    async fn counts_report_total_searched_and_filtered() {
        let ring = ring_of(3);
        let manager: SearchManager<Line> = SearchManager::subscribe("\"line 1\"", &ring);

        assert_eq!(manager.total_count().await, 3);
        assert_eq!(manager.searched_count().await, 3);
        assert_eq!(manager.filtered_count().await, 1);

        manager.process_new_record(&Line("line 1 again".to_string())).await.unwrap();
        assert_eq!(manager.total_count().await, 4);
        assert_eq!(manager.searched_count().await, 4);
        assert_eq!(manager.filtered_count().await, 2);

        manager.process_new_record(&Line("unrelated".to_string())).await.unwrap();
        assert_eq!(manager.total_count().await, 5);
        assert_eq!(manager.searched_count().await, 5);
        assert_eq!(manager.filtered_count().await, 2);
    }
}
