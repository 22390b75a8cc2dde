//! Fixture builders for seeding MockGridscaleClient

use crate::models::*;

/// Deterministic UUID for test object `n`
pub fn test_uuid(n: u64) -> String {
    format!("00000000-0000-4000-8000-{:012x}", n)
}

/// Powered-off, active server with no relations
pub fn server(id: &str, name: &str) -> Server {
    Server {
        object_uuid: id.to_string(),
        name: name.to_string(),
        cores: 1,
        memory: 2,
        location_uuid: test_uuid(1),
        hardware_profile: "default".to_string(),
        status: ACTIVE_STATUS.to_string(),
        ..Default::default()
    }
}

/// Active network; `public` marks the provider-wide public network
pub fn network(id: &str, name: &str, public: bool) -> Network {
    Network {
        object_uuid: id.to_string(),
        name: name.to_string(),
        status: ACTIVE_STATUS.to_string(),
        location_uuid: test_uuid(1),
        public_net: public,
        network_type: "network".to_string(),
        ..Default::default()
    }
}

/// Active IP address of the given family (4 or 6)
pub fn ip(id: &str, family: u8) -> Ip {
    let address = if family == 6 {
        "2a06:2380:0:1::100".to_string()
    } else {
        "185.201.147.10".to_string()
    };
    Ip {
        object_uuid: id.to_string(),
        prefix: if family == 6 {
            format!("{}/128", address)
        } else {
            format!("{}/32", address)
        },
        ip: address,
        family,
        status: ACTIVE_STATUS.to_string(),
        location_uuid: test_uuid(1),
        ..Default::default()
    }
}

/// Active 10 GB storage
pub fn storage(id: &str, name: &str) -> Storage {
    Storage {
        object_uuid: id.to_string(),
        name: name.to_string(),
        status: ACTIVE_STATUS.to_string(),
        capacity: 10,
        storage_type: "storage".to_string(),
        location_uuid: test_uuid(1),
        ..Default::default()
    }
}

/// Active ISO image
pub fn iso_image(id: &str, name: &str) -> IsoImage {
    IsoImage {
        object_uuid: id.to_string(),
        name: name.to_string(),
        status: ACTIVE_STATUS.to_string(),
        location_uuid: test_uuid(1),
        ..Default::default()
    }
}

/// Active storage snapshot
pub fn snapshot(id: &str, name: &str) -> StorageSnapshot {
    StorageSnapshot {
        object_uuid: id.to_string(),
        name: name.to_string(),
        status: ACTIVE_STATUS.to_string(),
        capacity: 10,
        location_uuid: test_uuid(1),
        ..Default::default()
    }
}

/// Active PaaS security zone
pub fn security_zone(id: &str, name: &str) -> SecurityZone {
    SecurityZone {
        object_uuid: id.to_string(),
        name: name.to_string(),
        status: ACTIVE_STATUS.to_string(),
        location_uuid: test_uuid(1),
        ..Default::default()
    }
}

/// Object storage key pair; the access key doubles as its id
pub fn access_key(access_key: &str, secret_key: &str) -> ObjectStorageAccessKey {
    ObjectStorageAccessKey {
        access_key: access_key.to_string(),
        secret_key: secret_key.to_string(),
        user_uuid: test_uuid(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_is_well_formed_and_distinct() {
        let a = test_uuid(1);
        let b = test_uuid(2);
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
        assert_eq!(a.matches('-').count(), 4);
    }
}
