// Full protocol flows: round trips through every parameter set, batch
// equivalence against the scalar engine, token determinism, and counter
// semantics.

use hkds::traits::{MasterKeyGen, SerDes};
use rand_chacha::rand_core::SeedableRng;
use rand_core::RngCore;


#[cfg(feature = "hkds-256")]
mod flows_256 {
    use super::*;
    use hkds::hkds_256 as mode;
    use hkds::HkdsError;

    fn fleet(
        seed: u64, count: usize,
    ) -> (mode::MasterKey, Vec<[u8; 12]>, Vec<mode::EmbeddedDeviceKey>) {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let mdk = mode::MdkGen::try_generate_with_rng(&mut rng, &[1, 2, 3, 4]).unwrap();
        let mut dids = Vec::new();
        let mut edks = Vec::new();
        for i in 0..count {
            let did: [u8; 12] = [
                0x01, 0, 0, 0, 0x11, mode::PROTOCOL_ID, 0x01, 0,
                (i + 1) as u8, 0, 0, 0,
            ];
            edks.push(mode::generate_edk(&mdk, &did));
            dids.push(did);
        }
        (mdk, dids, edks)
    }

    // Round trip (unauthenticated) across many counter values and cache
    // refills.
    #[test]
    fn round_trip_unauthenticated() {
        let (mdk, dids, edks) = fleet(11, 1);
        let mut client = mode::Client::new(&edks[0], &dids[0]);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(12);

        for _cycle in 0..100 {
            if client.cache_empty() {
                let server = mode::Server::new(&mdk, &client.ksn());
                let token = client.decrypt_token(&server.encrypt_token()).unwrap();
                client.generate_cache(&token);
            }
            let mut msg = [0u8; 16];
            rng.fill_bytes(&mut msg);
            let server = mode::Server::new(&mdk, &client.ksn());
            let ct = client.encrypt_message(&msg).unwrap();
            assert_eq!(server.decrypt_message(&ct), msg);
        }
    }

    // Round trip (authenticated), two cache slots per message.
    #[test]
    fn round_trip_authenticated() {
        let (mdk, dids, edks) = fleet(21, 1);
        let mut client = mode::Client::new(&edks[0], &dids[0]);
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(22);

        for cycle in 0u32..100 {
            if client.cache_empty() || client.transaction_counter() as usize % mode::CACHE_LEN
                == mode::CACHE_LEN - 1
            {
                // refill rather than burn the unpaired final slot
                let server = mode::Server::new(&mdk, &client.ksn());
                let token = client.decrypt_token(&server.encrypt_token()).unwrap();
                client.generate_cache(&token);
            }
            let mut msg = [0u8; 16];
            rng.fill_bytes(&mut msg);
            let ad = cycle.to_be_bytes();
            let server = mode::Server::new(&mdk, &client.ksn());
            let ct = client.encrypt_authenticate_message(&msg, &ad).unwrap();
            assert_eq!(server.decrypt_verify_message(&ct, &ad).unwrap(), msg);
        }
    }

    // A flipped tag bit must fail verification, for every bit of the tag.
    #[test]
    fn tag_bit_flips_are_rejected() {
        let (mdk, dids, edks) = fleet(31, 1);
        let mut client = mode::Client::new(&edks[0], &dids[0]);
        let server = mode::Server::new(&mdk, &client.ksn());
        let token = client.decrypt_token(&server.encrypt_token()).unwrap();
        client.generate_cache(&token);

        let ad = [0xC0, 0xA8, 0x00, 0x01];
        let ct = client.encrypt_authenticate_message(&[0x55; 16], &ad).unwrap();
        for bit in 0..128 {
            let mut tampered = ct;
            tampered[16 + bit / 8] ^= 1 << (bit % 8);
            assert_eq!(
                server.decrypt_verify_message(&tampered, &ad),
                Err(HkdsError::AuthFailure)
            );
        }
        // and the untampered ciphertext still verifies
        assert!(server.decrypt_verify_message(&ct, &ad).is_ok());
    }

    // Devices sharing a BDK derive unrelated keys: a ciphertext from one
    // does not decrypt meaningfully under a sibling's KSN.
    #[test]
    fn cross_device_isolation() {
        let (mdk, dids, edks) = fleet(41, 2);
        assert!(edks[0] != edks[1]);

        let mut client_a = mode::Client::new(&edks[0], &dids[0]);
        let server_a = mode::Server::new(&mdk, &client_a.ksn());
        let token = client_a.decrypt_token(&server_a.encrypt_token()).unwrap();
        client_a.generate_cache(&token);

        let msg = [0x77u8; 16];
        let ct = client_a.encrypt_message(&msg).unwrap();

        let mut ksn_b = [0u8; 16];
        ksn_b[..12].copy_from_slice(&dids[1]);
        let server_b = mode::Server::new(&mdk, &ksn_b);
        assert_ne!(server_b.decrypt_message(&ct), msg);
    }

    // Token issuance is deterministic within a cache epoch.
    #[test]
    fn token_idempotence() {
        let (mdk, dids, edks) = fleet(51, 1);
        let client = mode::Client::new(&edks[0], &dids[0]);
        let first = mode::Server::new(&mdk, &client.ksn()).encrypt_token();
        let second = mode::Server::new(&mdk, &client.ksn()).encrypt_token();
        assert_eq!(first[..], second[..]);
    }

    // The KSN counter advances by exactly the number of consumed slots.
    #[test]
    fn counter_advancement() {
        let (mdk, dids, edks) = fleet(61, 1);
        let mut client = mode::Client::new(&edks[0], &dids[0]);
        let server = mode::Server::new(&mdk, &client.ksn());
        let token = client.decrypt_token(&server.encrypt_token()).unwrap();
        client.generate_cache(&token);

        assert_eq!(client.transaction_counter(), 0);
        let _ct = client.encrypt_message(&[0u8; 16]).unwrap();
        assert_eq!(client.transaction_counter(), 1);
        let _ct = client.encrypt_authenticate_message(&[0u8; 16], &[]).unwrap();
        assert_eq!(client.transaction_counter(), 3);
    }

    // Batched x8 token wrap and decrypt agree byte for byte with the
    // scalar engine, on both the plain and authenticated paths.
    #[test]
    fn batch_x8_matches_scalar() {
        let (mdk, dids, edks) = fleet(71, 8);
        let mut clients: Vec<mode::Client> = dids
            .iter()
            .zip(edks.iter())
            .map(|(did, edk)| mode::Client::new(edk, did))
            .collect();

        // provisioning: the batched EDK derivation agrees lane for lane
        let did_array: [[u8; 12]; 8] = core::array::from_fn(|i| dids[i]);
        let batch_edks = mode::generate_edk_x8(&mdk, &did_array);
        for (batch_edk, edk) in batch_edks.iter().zip(edks.iter()) {
            assert!(batch_edk == edk);
        }

        let ksns: [[u8; 16]; 8] = core::array::from_fn(|i| clients[i].ksn());
        let batch = mode::ServerX8::new(&mdk, &ksns);

        // token wrap
        let batch_tokens = batch.encrypt_token_x8();
        for (i, client) in clients.iter().enumerate() {
            let scalar = mode::Server::new(&mdk, &client.ksn()).encrypt_token();
            assert_eq!(batch_tokens[i][..], scalar[..]);
        }

        // install caches, encrypt one unauthenticated message per lane
        for (client, etok) in clients.iter_mut().zip(batch_tokens.iter()) {
            let token = client.decrypt_token(etok).unwrap();
            client.generate_cache(&token);
        }
        let messages: [[u8; 16]; 8] = core::array::from_fn(|i| [(i * 17) as u8; 16]);
        let pre_ksns: [[u8; 16]; 8] = core::array::from_fn(|i| clients[i].ksn());
        let cts: [[u8; 16]; 8] =
            core::array::from_fn(|i| clients[i].encrypt_message(&messages[i]).unwrap());

        let batch = mode::ServerX8::new(&mdk, &pre_ksns);
        let batch_pts = batch.decrypt_message_x8(&cts);
        for i in 0..8 {
            let scalar = mode::Server::new(&mdk, &pre_ksns[i]).decrypt_message(&cts[i]);
            assert_eq!(batch_pts[i], scalar);
            assert_eq!(batch_pts[i], messages[i]);
        }

        // authenticated path
        let ad = [0xC0, 0xA8, 0x00, 0x01];
        let pre_ksns: [[u8; 16]; 8] = core::array::from_fn(|i| clients[i].ksn());
        let acts: [[u8; 32]; 8] = core::array::from_fn(|i| {
            clients[i].encrypt_authenticate_message(&messages[i], &ad).unwrap()
        });
        let ads: [&[u8]; 8] = [&ad; 8];

        let batch = mode::ServerX8::new(&mdk, &pre_ksns);
        let batch_pts = batch.decrypt_verify_message_x8(&acts, &ads);
        for i in 0..8 {
            let scalar = mode::Server::new(&mdk, &pre_ksns[i])
                .decrypt_verify_message(&acts[i], &ad)
                .unwrap();
            assert_eq!(batch_pts[i].unwrap(), scalar);
            assert_eq!(scalar, messages[i]);
        }
    }

    // The x64 fan-out agrees with 64 scalar sessions and completes every
    // lane.
    #[test]
    fn batch_x64_matches_scalar() {
        let (mdk, dids, edks) = fleet(81, 64);
        let mut clients: Vec<mode::Client> = dids
            .iter()
            .zip(edks.iter())
            .map(|(did, edk)| mode::Client::new(edk, did))
            .collect();

        for client in &mut clients {
            let server = mode::Server::new(&mdk, &client.ksn());
            let token = client.decrypt_token(&server.encrypt_token()).unwrap();
            client.generate_cache(&token);
        }

        let messages: [[[u8; 16]; 8]; 8] =
            core::array::from_fn(|i| core::array::from_fn(|l| [(i * 8 + l) as u8; 16]));
        let pre_ksns: [[[u8; 16]; 8]; 8] =
            core::array::from_fn(|i| core::array::from_fn(|l| clients[i * 8 + l].ksn()));
        let cts: [[[u8; 16]; 8]; 8] = core::array::from_fn(|i| {
            core::array::from_fn(|l| clients[i * 8 + l].encrypt_message(&messages[i][l]).unwrap())
        });

        let batches: Vec<mode::ServerX8<'_>> =
            pre_ksns.iter().map(|ksns| mode::ServerX8::new(&mdk, ksns)).collect();
        let batch_array: [mode::ServerX8<'_>; 8] =
            batches.try_into().ok().expect("batch count fail");

        let plaintext = mode::decrypt_message_x64(&batch_array, &cts);
        for i in 0..8 {
            for l in 0..8 {
                let scalar =
                    mode::Server::new(&mdk, &pre_ksns[i][l]).decrypt_message(&cts[i][l]);
                assert_eq!(plaintext[i][l], scalar);
                assert_eq!(plaintext[i][l], messages[i][l]);
            }
        }

        // token wrap across all 64 lanes
        let etoks = mode::encrypt_token_x64(&batch_array);
        for i in 0..8 {
            for l in 0..8 {
                let scalar = mode::Server::new(&mdk, &pre_ksns[i][l]).encrypt_token();
                assert_eq!(etoks[i][l][..], scalar[..]);
            }
        }
    }

    // A device key survives serialization at manufacture: the restored key
    // equals the derived one and drives a working session.
    #[test]
    fn provisioned_key_round_trip() {
        let (mdk, dids, edks) = fleet(95, 1);

        let edk_bytes = edks[0].clone().into_bytes();
        let restored = mode::EmbeddedDeviceKey::try_from_bytes(edk_bytes).unwrap();
        assert!(restored == edks[0]);

        let mut client = mode::Client::new(&restored, &dids[0]);
        let server = mode::Server::new(&mdk, &client.ksn());
        let token = client.decrypt_token(&server.encrypt_token()).unwrap();
        client.generate_cache(&token);

        let msg = [0x2Eu8; 16];
        let server = mode::Server::new(&mdk, &client.ksn());
        let ct = client.encrypt_message(&msg).unwrap();
        assert_eq!(server.decrypt_message(&ct), msg);
    }

    // The packet layer carries a full exchange.
    #[test]
    fn packet_round_trip() {
        let (mdk, dids, edks) = fleet(91, 1);
        let mut client = mode::Client::new(&edks[0], &dids[0]);

        let request_bytes = client.token_request().into_bytes();
        let request = mode::TokenRequest::try_from_bytes(request_bytes).unwrap();
        let server = mode::Server::new(&mdk, &request.ksn);

        let response_bytes = server.token_response().into_bytes();
        let response = mode::TokenResponse::try_from_bytes(response_bytes).unwrap();
        let token = client.decrypt_token(&response.etok).unwrap();
        client.generate_cache(&token);

        let msg = [0x42u8; 16];
        let ksn = client.ksn();
        let ct = client.encrypt_message(&msg).unwrap();
        let request_bytes =
            mode::MessageRequest::new(&ksn, &ct, None).into_bytes();
        let request = mode::MessageRequest::try_from_bytes(request_bytes).unwrap();

        let server = mode::Server::new(&mdk, &request.ksn);
        assert_eq!(server.decrypt_message(&request.message), msg);
    }
}


#[cfg(feature = "hkds-128")]
mod flows_128 {
    use super::*;
    use hkds::hkds_128 as mode;

    #[test]
    fn round_trip_both_paths() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(101);
        let mdk = mode::MdkGen::try_generate_with_rng(&mut rng, &[1, 2, 3, 4]).unwrap();
        let did: [u8; 12] = [0x01, 0, 0, 0, 0x11, mode::PROTOCOL_ID, 0x01, 0, 0x01, 0, 0, 0];
        let edk = mode::generate_edk(&mdk, &did);
        let mut client = mode::Client::new(&edk, &did);

        let server = mode::Server::new(&mdk, &client.ksn());
        let token = client.decrypt_token(&server.encrypt_token()).unwrap();
        client.generate_cache(&token);

        let msg = [0xA5u8; 16];
        let server = mode::Server::new(&mdk, &client.ksn());
        let ct = client.encrypt_message(&msg).unwrap();
        assert_eq!(server.decrypt_message(&ct), msg);

        let ad = [0x01, 0x02];
        let server = mode::Server::new(&mdk, &client.ksn());
        let ct = client.encrypt_authenticate_message(&msg, &ad).unwrap();
        assert_eq!(server.decrypt_verify_message(&ct, &ad).unwrap(), msg);
    }
}


#[cfg(feature = "hkds-512")]
mod flows_512 {
    use super::*;
    use hkds::hkds_512 as mode;

    #[test]
    fn round_trip_both_paths() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(201);
        let mdk = mode::MdkGen::try_generate_with_rng(&mut rng, &[1, 2, 3, 4]).unwrap();
        let did: [u8; 12] = [0x01, 0, 0, 0, 0x11, mode::PROTOCOL_ID, 0x01, 0, 0x01, 0, 0, 0];
        let edk = mode::generate_edk(&mdk, &did);
        let mut client = mode::Client::new(&edk, &did);

        let server = mode::Server::new(&mdk, &client.ksn());
        let token = client.decrypt_token(&server.encrypt_token()).unwrap();
        client.generate_cache(&token);

        let msg = [0x3Cu8; 16];
        let server = mode::Server::new(&mdk, &client.ksn());
        let ct = client.encrypt_message(&msg).unwrap();
        assert_eq!(server.decrypt_message(&ct), msg);

        let ad = [0xDEu8, 0xAD, 0xBE, 0xEF];
        let server = mode::Server::new(&mdk, &client.ksn());
        let ct = client.encrypt_authenticate_message(&msg, &ad).unwrap();
        assert_eq!(server.decrypt_verify_message(&ct, &ad).unwrap(), msg);
    }

    // The x8 engine agrees with the scalar path at the smallest rate too,
    // where cache streams span the most squeeze blocks.
    #[test]
    fn batch_x8_matches_scalar() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(211);
        let mdk = mode::MdkGen::try_generate_with_rng(&mut rng, &[1, 2, 3, 4]).unwrap();
        let dids: [[u8; 12]; 8] = core::array::from_fn(|i| {
            [0x01, 0, 0, 0, 0x10, mode::PROTOCOL_ID, 0x01, 0, (i + 1) as u8, 0, 0, 0]
        });
        let mut clients: Vec<mode::Client> = dids
            .iter()
            .map(|did| mode::Client::new(&mode::generate_edk(&mdk, did), did))
            .collect();

        // advance lanes to different cache depths
        for (i, client) in clients.iter_mut().enumerate() {
            let server = mode::Server::new(&mdk, &client.ksn());
            let token = client.decrypt_token(&server.encrypt_token()).unwrap();
            client.generate_cache(&token);
            for _ in 0..i {
                let _ct = client.encrypt_message(&[0u8; 16]).unwrap();
            }
        }

        let pre_ksns: [[u8; 16]; 8] = core::array::from_fn(|i| clients[i].ksn());
        let messages: [[u8; 16]; 8] = core::array::from_fn(|i| [(0x30 + i) as u8; 16]);
        let cts: [[u8; 16]; 8] =
            core::array::from_fn(|i| clients[i].encrypt_message(&messages[i]).unwrap());

        let batch = mode::ServerX8::new(&mdk, &pre_ksns);
        let batch_pts = batch.decrypt_message_x8(&cts);
        for i in 0..8 {
            let scalar = mode::Server::new(&mdk, &pre_ksns[i]).decrypt_message(&cts[i]);
            assert_eq!(batch_pts[i], scalar);
            assert_eq!(batch_pts[i], messages[i]);
        }
    }
}
