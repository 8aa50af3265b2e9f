//! 可观测性模块集成测试
//!
//! 测试 metrics、middleware 和配置的公开接口。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use delivery_shared::observability::metrics::{
        record_delivery, record_fanout, record_http_request,
    };

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/admin/notifications", 200, 0.05);
        record_http_request("POST", "/api/admin/notifications", 200, 0.12);
        record_http_request("POST", "/api/admin/notifications/7/send", 200, 0.01);
        record_http_request("GET", "/api/admin/notifications/404", 404, 0.01);
        record_http_request("POST", "/api/admin/notifications", 400, 0.02);
    }

    #[test]
    fn test_record_fanout_outcomes() {
        record_fanout("completed", 0.8);
        record_fanout("partial", 1.5);
        record_fanout("failed", 0.2);
        record_fanout("not_found", 0.0);
    }

    #[test]
    fn test_record_delivery_per_category() {
        for category in ["customer", "merchant", "driver"] {
            record_delivery(category, "delivered");
            record_delivery(category, "failed");
        }
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        // 空字符串
        record_http_request("", "", 0, 0.0);

        // 超长路径
        let long_path = "/api/".to_string() + &"x".repeat(1000);
        record_http_request("GET", &long_path, 200, 0.01);

        // 极端持续时间
        record_fanout("completed", 86_400.0);
        record_fanout("completed", 0.000001);
    }
}

// ============================================================================
// 中间件测试
// ============================================================================

mod middleware_tests {
    use delivery_shared::observability::middleware::RequestId;

    #[test]
    fn test_request_id_creation() {
        let id = RequestId("test-id-123".to_string());
        assert_eq!(id.as_str(), "test-id-123");
    }

    #[test]
    fn test_request_id_clone() {
        let id1 = RequestId("original".to_string());
        let id2 = id1.clone();
        assert_eq!(id1.as_str(), id2.as_str());
    }
}

// ============================================================================
// 配置测试
// ============================================================================

mod config_tests {
    use delivery_shared::observability::ObservabilityConfig;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "unknown-service");
        assert_eq!(config.metrics_port, 9090);
        assert!(config.metrics_enabled);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_custom_config() {
        let config = ObservabilityConfig {
            service_name: "delivery-admin-service".to_string(),
            metrics_port: 9091,
            metrics_enabled: false,
            log_level: "debug".to_string(),
            json_logs: true,
        };

        assert_eq!(config.metrics_port, 9091);
        assert!(!config.metrics_enabled);
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);
    }
}

// ============================================================================
// Guard 测试
// ============================================================================

mod guard_tests {
    use delivery_shared::observability::ObservabilityGuard;

    #[test]
    fn test_empty_guard() {
        let guard = ObservabilityGuard::empty();
        drop(guard);
    }
}
