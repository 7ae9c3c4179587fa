//! Runtime lifecycle ordering: which calls are legal in which phase.

use normcheck_core::{DType, HostArray, NormError, Runtime, Shape};

fn shape() -> Shape {
    Shape::new(vec![2, 4])
}

fn host() -> HostArray {
    HostArray::from_f32(shape(), (0..8).map(|i| i as f32 * 0.125).collect()).unwrap()
}

fn is_lifecycle<T: std::fmt::Debug>(r: normcheck_core::Result<T>) -> bool {
    matches!(r, Err(NormError::Lifecycle(_)))
}

#[test]
fn load_before_launch_rejected() {
    let rt = Runtime::cpu();
    let x = rt.tensor(shape(), DType::F32).unwrap();
    assert!(is_lifecycle(x.load_from_host(&host())));
}

#[test]
fn copy_before_launch_rejected() {
    let rt = Runtime::cpu();
    let x = rt.tensor(shape(), DType::F32).unwrap();
    assert!(is_lifecycle(x.copy_to_host()));
}

#[test]
fn run_before_launch_rejected() {
    let rt = Runtime::cpu();
    let _x = rt.tensor(shape(), DType::F32).unwrap();
    assert!(is_lifecycle(rt.run(1, false)));
}

#[test]
fn stop_without_run_rejected() {
    let rt = Runtime::cpu();
    rt.launch().unwrap();
    assert!(is_lifecycle(rt.stop()));
}

#[test]
fn double_launch_rejected() {
    let rt = Runtime::cpu();
    rt.launch().unwrap();
    assert!(is_lifecycle(rt.launch()));
}

#[test]
fn graph_frozen_after_launch() {
    let rt = Runtime::cpu();
    let x = rt.tensor(shape(), DType::F32).unwrap();
    rt.launch().unwrap();
    assert!(is_lifecycle(rt.tensor(shape(), DType::F32)));
    assert!(is_lifecycle(x.softmax(-1)));
}

#[test]
fn buffers_locked_until_stop() {
    let rt = Runtime::cpu();
    let x = rt.tensor(shape(), DType::F32).unwrap();
    let y = x.softmax(-1).unwrap();
    rt.launch().unwrap();
    x.load_from_host(&host()).unwrap();

    rt.run(2, true).unwrap();
    assert!(is_lifecycle(y.copy_to_host()));
    assert!(is_lifecycle(x.load_from_host(&host())));
    assert!(is_lifecycle(rt.run(1, true)));

    rt.stop().unwrap();
    assert_eq!(y.copy_to_host().unwrap().shape(), &shape());
    // A second run after stop is fine.
    rt.run(1, false).unwrap();
    rt.stop().unwrap();
}

#[test]
fn zero_iterations_rejected() {
    let rt = Runtime::cpu();
    rt.launch().unwrap();
    assert!(matches!(rt.run(0, false), Err(NormError::InvalidArgument(_))));
}

#[test]
fn load_checks_shape_and_dtype() {
    let rt = Runtime::cpu();
    let x = rt.tensor(shape(), DType::F16).unwrap();
    let y = x.softmax(-1).unwrap();
    rt.launch().unwrap();

    assert!(matches!(
        x.load_from_host(&host()),
        Err(NormError::DTypeMismatch {
            expected: DType::F16,
            got: DType::F32
        })
    ));
    let wrong = HostArray::from_f32(Shape::new(vec![8]), vec![0.0; 8]).unwrap();
    assert!(matches!(
        x.load_from_host(&wrong),
        Err(NormError::ShapeMismatch { .. })
    ));
    // Outputs are not loadable.
    assert!(matches!(
        y.load_from_host(&host()),
        Err(NormError::InvalidArgument(_))
    ));
}

#[test]
fn buffers_zeroed_at_launch() {
    let rt = Runtime::cpu();
    let x = rt.tensor(shape(), DType::F32).unwrap();
    let y = x.reduce_sum(-1, false).unwrap();
    rt.launch().unwrap();
    assert_eq!(x.copy_to_host().unwrap().to_f32_vec(), vec![0.0; 8]);
    assert_eq!(y.copy_to_host().unwrap().to_f32_vec(), vec![0.0; 2]);
}

#[test]
fn reduce_sum_relu_end_to_end() {
    let _ = tracing_subscriber::fmt::try_init();
    let rt = Runtime::cpu();
    let x = rt.tensor(Shape::new(vec![2, 3]), DType::F32).unwrap();
    let plain = x.reduce_sum(1, false).unwrap();
    let clamped = x.reduce_sum(1, true).unwrap();
    rt.launch().unwrap();
    x.load_from_host(
        &HostArray::from_f32(
            Shape::new(vec![2, 3]),
            vec![-1.0, -2.0, 0.5, 1.0, 2.0, 3.0],
        )
        .unwrap(),
    )
    .unwrap();
    rt.run(1, true).unwrap();
    rt.stop().unwrap();

    assert_eq!(plain.copy_to_host().unwrap().to_f32_vec(), vec![-2.5, 6.0]);
    assert_eq!(clamped.copy_to_host().unwrap().to_f32_vec(), vec![0.0, 6.0]);
    assert_eq!(plain.shape(), &Shape::new(vec![2, 1]));
}

#[test]
fn chained_ops_evaluate_in_order() {
    let rt = Runtime::cpu();
    let x = rt.tensor(Shape::new(vec![3, 4]), DType::F32).unwrap();
    // Row sums of a softmax are all one.
    let sums = x.softmax(-1).unwrap().reduce_sum(-1, false).unwrap();
    rt.launch().unwrap();
    x.load_from_host(
        &HostArray::from_f32(
            Shape::new(vec![3, 4]),
            (0..12).map(|i| (i as f32).sin()).collect(),
        )
        .unwrap(),
    )
    .unwrap();
    rt.run(1, false).unwrap();
    rt.stop().unwrap();
    for v in sums.copy_to_host().unwrap().to_f32_vec() {
        assert!((v - 1.0).abs() < 1e-5);
    }
}
