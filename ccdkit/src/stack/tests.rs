use super::*;

#[test]
fn test_shape_plane_count_flattens_leading_dims() {
    let shape = StackShape::new(&[2, 3, 4, 5]).unwrap();
    assert_eq!(shape.plane_count(), 6);
    assert_eq!(shape.height(), 4);
    assert_eq!(shape.width(), 5);
    assert_eq!(shape.plane_len(), 20);
    assert_eq!(shape.len(), 120);
    assert_eq!(shape.ndims(), 4);
}

#[test]
fn test_shape_two_dims_is_single_plane() {
    let shape = StackShape::new(&[7, 9]).unwrap();
    assert_eq!(shape.plane_count(), 1);
    assert_eq!(shape.len(), 63);
}

#[test]
fn test_shape_zero_planes_is_legal() {
    let shape = StackShape::new(&[0, 4, 4]).unwrap();
    assert_eq!(shape.plane_count(), 0);
    assert!(shape.is_empty());
}

#[test]
fn test_shape_rejects_one_dim() {
    let err = StackShape::new(&[16]).unwrap_err();
    assert!(matches!(err, Error::TooFewDimensions { ndims: 1 }));
}

#[test]
fn test_shape_rejects_empty_plane() {
    assert!(matches!(
        StackShape::new(&[3, 0, 4]).unwrap_err(),
        Error::EmptyPlane { .. }
    ));
    assert!(matches!(
        StackShape::new(&[3, 4, 0]).unwrap_err(),
        Error::EmptyPlane { .. }
    ));
}

#[test]
fn test_shape_rejects_sample_count_overflow() {
    for dims in [
        vec![usize::MAX, 2, 2],
        vec![1 << 62, 2, 2],
        vec![usize::MAX, usize::MAX],
        vec![1 << 40, 1 << 40, 1, 1],
    ] {
        let err = ImageStack::<f32>::new(&dims, Vec::new()).unwrap_err();
        assert!(
            matches!(&err, Error::ShapeOverflow { dims: reported } if *reported == dims),
            "dims {dims:?}: {err}"
        );
    }
}

#[test]
fn test_shape_at_usize_limit_is_accepted() {
    let shape = StackShape::new(&[usize::MAX, 1, 1]).unwrap();
    assert_eq!(shape.plane_count(), usize::MAX);
    assert_eq!(shape.len(), usize::MAX);
}

#[test]
fn test_shape_swapped_plane_axes() {
    let shape = StackShape::new(&[2, 3, 4]).unwrap();
    assert_eq!(shape.with_swapped_plane_axes().dims(), &[2, 4, 3]);
}

#[test]
fn test_stack_rejects_wrong_buffer_length() {
    let err = ImageStack::new(&[2, 2, 2], vec![0.0f32; 7]).unwrap_err();
    match err {
        Error::BufferLength {
            expected, actual, ..
        } => {
            assert_eq!(expected, 8);
            assert_eq!(actual, 7);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_stack_plane_access() {
    let data: Vec<u16> = (0..24).collect();
    let stack = ImageStack::new(&[2, 3, 4], data).unwrap();

    assert_eq!(stack.plane(0), &(0..12).collect::<Vec<_>>()[..]);
    assert_eq!(stack.plane(1), &(12..24).collect::<Vec<_>>()[..]);
    assert_eq!(*stack.get(1, 2, 3), 23);
    assert_eq!(*stack.get(0, 1, 0), 4);
    assert_eq!(stack.planes().count(), 2);
}

#[test]
fn test_stack_from_planes() {
    let a = Plane::filled(2, 3, 1.0f32).unwrap();
    let b = Plane::filled(2, 3, 2.0f32).unwrap();
    let stack = ImageStack::from_planes(&[a, b.clone()]).unwrap();

    assert_eq!(stack.dims(), &[2, 2, 3]);
    assert_eq!(stack.to_plane(1), b);
}

#[test]
fn test_plane_filled_reports_allocation_failure() {
    let err = Plane::filled(usize::MAX / 4, 2, 0.0f64).unwrap_err();
    assert!(matches!(err, Error::Allocation { what: "plane", .. }));
}

#[test]
fn test_stack_from_planes_rejects_mixed_shapes() {
    let a = Plane::filled(2, 3, 1.0f32).unwrap();
    let b = Plane::filled(3, 2, 1.0f32).unwrap();
    assert!(matches!(
        ImageStack::from_planes(&[a, b]).unwrap_err(),
        Error::ShapeMismatch { .. }
    ));
}

#[test]
fn test_stack_from_planes_rejects_empty() {
    let planes: [Plane<f32>; 0] = [];
    assert!(matches!(
        ImageStack::from_planes(&planes).unwrap_err(),
        Error::InvalidParameter { name: "planes", .. }
    ));
}

#[test]
fn test_plane_indexing_is_row_major() {
    let plane = Plane::new(2, 3, vec![0, 1, 2, 3, 4, 5]).unwrap();
    assert_eq!(plane[(0, 2)], 2);
    assert_eq!(plane[(1, 0)], 3);
    assert_eq!(*plane.get(1, 2), 5);
}

#[test]
fn test_plane_into_stack() {
    let plane = Plane::new(2, 2, vec![1u8, 2, 3, 4]).unwrap();
    let stack = plane.into_stack();
    assert_eq!(stack.dims(), &[2, 2]);
    assert_eq!(stack.plane_count(), 1);
    assert_eq!(stack.shape(), &StackShape::new(&[2, 2]).unwrap());
    assert_eq!(stack.as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn test_plane_rejects_wrong_length() {
    assert!(matches!(
        Plane::new(2, 2, vec![0.0f32; 3]).unwrap_err(),
        Error::BufferLength { .. }
    ));
}
