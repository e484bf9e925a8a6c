use criterion::{criterion_group, criterion_main, Criterion};
use hkds::hkds_256;
use hkds::traits::MasterKeyGen;
use rand_core::{CryptoRng, RngCore};


// Test RNG to regurgitate incremented values when 'asked'
struct TestRng {
    value: u32,
}

impl RngCore for TestRng {
    fn next_u32(&mut self) -> u32 { unimplemented!() }

    fn next_u64(&mut self) -> u64 { unimplemented!() }

    fn fill_bytes(&mut self, _out: &mut [u8]) { unimplemented!() }

    fn try_fill_bytes(&mut self, out: &mut [u8]) -> Result<(), rand_core::Error> {
        out.iter_mut().for_each(|b| *b = 0);
        out[0..4].copy_from_slice(&self.value.to_be_bytes());
        self.value = self.value.wrapping_add(1);
        Ok(())
    }
}

impl CryptoRng for TestRng {}


pub fn criterion_benchmark(c: &mut Criterion) {
    // Generate intermediate values needed for the actual benchmark functions
    let mut bench_rng = TestRng { value: 0 };
    let mdk = hkds_256::MdkGen::try_generate_with_rng(&mut bench_rng, &[1, 2, 3, 4]).unwrap();

    let did: [u8; 12] = [0x01, 0, 0, 0, 0x11, hkds_256::PROTOCOL_ID, 0x01, 0, 0x01, 0, 0, 0];
    let edk = hkds_256::generate_edk(&mdk, &did);
    let mut client = hkds_256::Client::new(&edk, &did);
    let server = hkds_256::Server::new(&mdk, &client.ksn());
    let token = client.decrypt_token(&server.encrypt_token()).unwrap();
    client.generate_cache(&token);
    let ksn = client.ksn();
    let ct = client.encrypt_message(&[0u8; 16]).unwrap();
    let act = client.encrypt_authenticate_message(&[0u8; 16], &[0xC0, 0xA8, 0, 1]).unwrap();

    let dids: [[u8; 12]; 8] = core::array::from_fn(|i| {
        [0x01, 0, 0, 0, 0x10, hkds_256::PROTOCOL_ID, 0x01, 0, (i + 1) as u8, 0, 0, 0]
    });
    let ksns: [[u8; 16]; 8] = core::array::from_fn(|i| {
        let mut ksn = [0u8; 16];
        ksn[..12].copy_from_slice(&dids[i]);
        ksn
    });
    let cts8 = [[0u8; 16]; 8];

    c.bench_function("hkds_256 generate_edk", |b| {
        b.iter(|| hkds_256::generate_edk(&mdk, &did))
    });

    c.bench_function("hkds_256 encrypt_token", |b| {
        let server = hkds_256::Server::new(&mdk, &ksn);
        b.iter(|| server.encrypt_token())
    });

    c.bench_function("hkds_256 decrypt_message", |b| {
        let server = hkds_256::Server::new(&mdk, &ksn);
        b.iter(|| server.decrypt_message(&ct))
    });

    c.bench_function("hkds_256 decrypt_verify_message", |b| {
        let mut ksn2 = ksn;
        ksn2[15] = 0x01; // the authenticated message consumed slots 1 and 2
        let server = hkds_256::Server::new(&mdk, &ksn2);
        b.iter(|| server.decrypt_verify_message(&act, &[0xC0, 0xA8, 0, 1]))
    });

    c.bench_function("hkds_256 encrypt_token_x8", |b| {
        let server = hkds_256::ServerX8::new(&mdk, &ksns);
        b.iter(|| server.encrypt_token_x8())
    });

    c.bench_function("hkds_256 decrypt_message_x8", |b| {
        let server = hkds_256::ServerX8::new(&mdk, &ksns);
        b.iter(|| server.decrypt_message_x8(&cts8))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
