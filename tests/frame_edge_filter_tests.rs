use edgecv::{process_frame, Error, FrameEdgeFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn random_frame(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buf = vec![0u8; width * height * 4];
    rng.fill(buf.as_mut_slice());
    buf
}

fn blocks_frame(width: usize, height: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            let on = (x / 8 + y / 8) % 2 == 0;
            let px = if on { [250, 240, 230, 255] } else { [10, 20, 30, 255] };
            buf.extend_from_slice(&px);
        }
    }
    buf
}

#[test]
fn test_output_length_matches_pixel_count() {
    for (w, h) in [(1, 1), (3, 7), (16, 9), (64, 48), (101, 33)] {
        let input = random_frame(w, h, (w * h) as u64);
        let out = process_frame(&input, w as i32, h as i32).unwrap();
        assert_eq!(out.len(), w * h, "{w}x{h}");
    }
}

#[test]
fn test_output_is_binary() {
    init_tracing();
    let input = random_frame(80, 60, 7);
    let out = process_frame(&input, 80, 60).unwrap();
    assert!(out.iter().all(|&v| v == 0 || v == 255));
    assert!(out.iter().any(|&v| v == 255));
}

#[test]
fn test_deterministic() {
    let input = blocks_frame(96, 64);
    let a = process_frame(&input, 96, 64).unwrap();
    let b = process_frame(&input, 96, 64).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_input_unmodified() {
    let input = random_frame(40, 40, 11);
    let before = input.clone();
    let _ = process_frame(&input, 40, 40).unwrap();
    assert_eq!(input, before);
}

#[test]
fn test_single_pixel() {
    let out = process_frame(&[12, 34, 56, 255], 1, 1).unwrap();
    assert_eq!(out, vec![0]);
}

#[test]
fn test_length_mismatch() {
    init_tracing();
    let input = vec![0u8; 10];
    let err = process_frame(&input, 2, 2).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)), "{err}");
}

#[test]
fn test_non_positive_dimensions() {
    for (w, h) in [(0, 4), (4, 0), (0, 0), (-1, 4), (4, -3)] {
        let err = process_frame(&[], w, h).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{w}x{h}: {err}");
    }
}

#[test]
fn test_black_frame() {
    let input: Vec<u8> = [0u8, 0, 0, 255].repeat(16);
    let out = process_frame(&input, 4, 4).unwrap();
    assert_eq!(out, vec![0u8; 16]);
}

#[test]
fn test_alpha_does_not_matter() {
    let opaque = blocks_frame(32, 32);
    let mut clear = opaque.clone();
    for px in clear.chunks_exact_mut(4) {
        px[3] = 0;
    }
    assert_eq!(
        process_frame(&opaque, 32, 32).unwrap(),
        process_frame(&clear, 32, 32).unwrap()
    );
}

#[test]
fn test_dedicated_pool_parity() {
    let input = random_frame(123, 77, 42);
    let pooled = FrameEdgeFilter::with_threads(3).unwrap();
    assert_eq!(
        pooled.process(&input, 123, 77).unwrap(),
        process_frame(&input, 123, 77).unwrap()
    );
}

#[test]
fn test_concurrent_calls() {
    let input = blocks_frame(64, 64);
    let expected = process_frame(&input, 64, 64).unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| process_frame(&input, 64, 64).unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    });
}

#[test]
fn test_edge_map_counts() {
    let input = blocks_frame(32, 32);
    let filter = FrameEdgeFilter::new();
    let dims = edgecv::FrameDims::new(32, 32).unwrap();
    let frame = edgecv::RgbaFrame::new(&input, dims).unwrap();
    let map = filter.process_frame(&frame).unwrap();
    assert_eq!(map.dims(), dims);
    assert_eq!(map.edge_count(), map.as_bytes().iter().filter(|&&v| v == 255).count());
    assert!(map.edge_count() > 0);
}
