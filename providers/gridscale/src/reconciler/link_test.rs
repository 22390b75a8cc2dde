//! Unit tests for linking the dependencies of a new server

#[cfg(test)]
mod tests {
    use super::super::link::network_request;
    use crate::error::ProviderError;
    use crate::model::AttachmentSet;
    use crate::test_utils::*;
    use gridscale_client::{LinkNetworkRequest, MockCall, MockOp};

    fn link_storage(n: u64, bootdevice: bool) -> MockCall {
        MockCall::LinkStorage {
            server: uuid(SERVER),
            storage: uuid(n),
            bootdevice,
        }
    }

    #[tokio::test]
    async fn test_reconcile_create_links_in_order() {
        let mock = seeded_mock();
        let server = uuid(SERVER);
        let attachments = AttachmentSet {
            storages: vec![storage_attachment(2, false), storage_attachment(3, true)],
            networks: vec![network_attachment(11, false), network_attachment(12, true)],
            ipv4: Some(uuid(20)),
            ipv6: Some(uuid(22)),
            iso_image: Some(uuid(30)),
            public_network: true,
        };

        reconciler(&mock, &server)
            .reconcile_create(&attachments)
            .await
            .unwrap();

        let public = LinkNetworkRequest {
            firewall: Some(Default::default()),
            ..Default::default()
        };
        assert_eq!(
            mock.link_calls(),
            vec![
                // Boot storage goes first
                link_storage(3, true),
                link_storage(2, false),
                MockCall::LinkIp { server: server.clone(), ip: uuid(20) },
                MockCall::LinkIp { server: server.clone(), ip: uuid(22) },
                MockCall::LinkIsoImage { server: server.clone(), iso_image: uuid(30) },
                MockCall::LinkNetwork { server: server.clone(), network: uuid(10), request: public },
                MockCall::LinkNetwork {
                    server: server.clone(),
                    network: uuid(12),
                    request: network_request(&network_attachment(12, true)),
                },
                MockCall::LinkNetwork {
                    server: server.clone(),
                    network: uuid(11),
                    request: network_request(&network_attachment(11, false)),
                },
            ]
        );

        let live = live_config(&mock);
        assert!(live.attachments.public_network);
        assert_eq!(live.attachments.ipv4, Some(uuid(20)));
        assert_eq!(live.attachments.ipv6, Some(uuid(22)));
        assert_eq!(live.attachments.networks.len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_create_without_attachments_makes_no_calls() {
        let mock = seeded_mock();
        let server = uuid(SERVER);

        reconciler(&mock, &server)
            .reconcile_create(&AttachmentSet::default())
            .await
            .unwrap();

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ipv4_address_in_ipv6_slot_fails_before_any_link() {
        let mock = seeded_mock();
        let server = uuid(SERVER);
        let attachments = AttachmentSet {
            storages: vec![storage_attachment(2, true)],
            ipv4: Some(uuid(20)),
            ipv6: Some(uuid(21)),
            public_network: true,
            ..Default::default()
        };

        let err = reconciler(&mock, &server)
            .reconcile_create(&attachments)
            .await
            .unwrap_err();

        match err {
            ProviderError::Validation(msg) => {
                assert!(msg.contains(&uuid(21)), "message should name the address: {}", msg);
                assert!(msg.contains("IPv4"));
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
        assert!(mock.link_calls().is_empty());
    }

    #[tokio::test]
    async fn test_public_network_listed_as_network_fails_before_any_link() {
        let mock = seeded_mock();
        let server = uuid(SERVER);
        let attachments = AttachmentSet {
            storages: vec![storage_attachment(2, true)],
            networks: vec![network_attachment(11, false), network_attachment(10, false)],
            ..Default::default()
        };

        let err = reconciler(&mock, &server)
            .reconcile_create(&attachments)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_link_error_carries_context_and_status() {
        let mock = seeded_mock();
        let server = uuid(SERVER);
        mock.fail_next(MockOp::LinkStorage, 500);

        let err = reconciler(&mock, &server)
            .link_storages(&[storage_attachment(2, true)])
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains(&uuid(2)));
        assert!(err.to_string().contains(&server));
    }

    #[tokio::test]
    async fn test_link_networks_public_ignores_given_networks() {
        let mock = seeded_mock();
        let server = uuid(SERVER);

        reconciler(&mock, &server)
            .link_networks(&[network_attachment(11, false)], true)
            .await
            .unwrap();

        let calls = mock.link_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].references(&uuid(10)));
    }

    #[tokio::test]
    async fn test_link_iso_image_none_is_noop() {
        let mock = seeded_mock();
        let server = uuid(SERVER);

        reconciler(&mock, &server).link_iso_image(None).await.unwrap();
        reconciler(&mock, &server).link_ipv4(None).await.unwrap();
        reconciler(&mock, &server).link_ipv6(None).await.unwrap();

        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_network_request_carries_firewall_rules() {
        let mut attachment = network_attachment(11, true);
        attachment.firewall.rules_v4_in.push(crate::model::FirewallRule {
            order: 0,
            action: crate::model::FirewallAction::Allow,
            protocol: Some(crate::model::FirewallProtocol::Tcp),
            dst_port: Some("22".to_string()),
            ..Default::default()
        });

        let request = network_request(&attachment);
        assert!(request.bootdevice);
        let firewall = request.firewall.unwrap();
        assert_eq!(firewall.rules_v4_in.len(), 1);
        assert!(firewall.rules_v6_in.is_empty());
    }
}
