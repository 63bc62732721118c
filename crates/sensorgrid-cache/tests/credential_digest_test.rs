use rand::distributions::Alphanumeric;
use rand::Rng;
use sensorgrid_domain::digest_api_key;
use std::collections::HashSet;

fn random_key(rng: &mut impl Rng) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[test]
fn test_no_digest_collisions_over_large_corpus() {
    let mut rng = rand::thread_rng();
    let mut keys = HashSet::new();
    while keys.len() < 10_000 {
        keys.insert(random_key(&mut rng));
    }

    let mut digests = HashSet::new();
    for key in &keys {
        let digest = digest_api_key(key);
        // The plaintext never appears as a cache key
        assert_ne!(&digest, key);
        assert!(digests.insert(digest), "digest collision for key {key}");
    }
    assert_eq!(digests.len(), keys.len());
}
