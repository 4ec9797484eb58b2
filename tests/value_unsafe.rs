use vtmem::{
    AccessError, AddressingMode, ByteOffset, FieldValue, Fixtures, GcPolicy, ObjectRef, Runtime,
    RuntimeConfig, TypeDescriptor, UnsafeAccess,
};

const FLAT: usize = 99999;

fn configs() -> Vec<RuntimeConfig> {
    let mut configs = vec![];
    for addressing in [AddressingMode::Compressed, AddressingMode::Full] {
        for threshold in [0, FLAT] {
            for array_flattening in [false, true] {
                for (dual, policy) in [
                    (true, GcPolicy::Gencon),
                    (false, GcPolicy::Gencon),
                    (true, GcPolicy::Metronome),
                ] {
                    configs.push(
                        RuntimeConfig::default()
                            .with_addressing(addressing)
                            .with_flattening_threshold(threshold)
                            .with_array_flattening(array_flattening)
                            .with_gc(dual, policy),
                    );
                }
            }
        }
    }
    configs
}

struct Setup {
    runtime: Runtime,
    t: Fixtures,
    compressed: bool,
    flattening: bool,
    array_flattening: bool,
    dual_header_gencon: bool,

    vt_point: ObjectRef,
    vt_point_ary: ObjectRef,
    vt_int_ary: ObjectRef,

    point_x: ByteOffset,
    point_y: ByteOffset,
    long_point_x: ByteOffset,
    long_point_y: ByteOffset,
    point_ary_0: ByteOffset,
    point_ary_1: ByteOffset,
    int_wrapper_vti: ByteOffset,
    int_ary_0: ByteOffset,
    int_ary_1: ByteOffset,
}

impl Setup {
    fn new(config: RuntimeConfig) -> Self {
        let (runtime, t) = Runtime::with_fixtures(config).unwrap();
        let u = runtime.unsafe_access();
        let point_x = u.object_field_offset(&t.point, "x").unwrap();
        let point_y = u.object_field_offset(&t.point, "y").unwrap();
        let long_point_x = u.object_field_offset(&t.long_point, "x").unwrap();
        let long_point_y = u.object_field_offset(&t.long_point, "y").unwrap();
        let int_wrapper_vti = u.object_field_offset(&t.int_wrapper, "vti").unwrap();
        let point_ary_0 = u.array_base_offset(Some(&t.point_array)).unwrap();
        let int_ary_0 = u.array_base_offset(Some(&t.value_int_array)).unwrap();

        let mut setup = Self {
            compressed: config.addressing == AddressingMode::Compressed,
            flattening: config.flattening_threshold == FLAT,
            array_flattening: config.array_flattening,
            dual_header_gencon: config.gc.dual_header_shape && config.gc.policy == GcPolicy::Gencon,
            vt_point: ObjectRef::NULL,
            vt_point_ary: ObjectRef::NULL,
            vt_int_ary: ObjectRef::NULL,
            point_x,
            point_y,
            long_point_x,
            long_point_y,
            point_ary_0,
            point_ary_1: point_ary_0,
            int_wrapper_vti,
            int_ary_0,
            int_ary_1: int_ary_0,
            runtime,
            t,
        };

        setup.vt_point = setup.point(7, 8);
        let elements = [setup.point(5, 10), setup.point(10, 20)];
        setup.vt_point_ary = setup
            .heap()
            .new_array_from(&setup.t.point_array, &elements)
            .unwrap();
        setup.point_ary_1 = point_ary_0 + setup.array_element_size(&setup.vt_point_ary, &setup.t.point_array);
        let elements = [setup.int(1), setup.int(2)];
        setup.vt_int_ary = setup
            .heap()
            .new_array_from(&setup.t.value_int_array, &elements)
            .unwrap();
        setup.int_ary_1 = int_ary_0 + setup.array_element_size(&setup.vt_int_ary, &setup.t.value_int_array);
        setup
    }

    fn heap(&self) -> &vtmem::Heap {
        self.runtime.heap()
    }

    fn u(&self) -> UnsafeAccess<'_> {
        self.runtime.unsafe_access()
    }

    fn array_element_size(&self, array: &ObjectRef, ty: &TypeDescriptor) -> usize {
        let length = array.as_object().unwrap().array_length().unwrap();
        let size = self.u().get_object_size(array).unwrap();
        let base = self.u().array_base_offset(Some(ty)).unwrap();
        (size - base.as_usize()) / length
    }

    fn int(&self, i: i32) -> ObjectRef {
        self.heap().new_instance(&self.t.value_int, &[("i", i.into())]).unwrap()
    }

    fn int2(&self, i: i32) -> ObjectRef {
        self.heap().new_instance(&self.t.value_int2, &[("i", i.into())]).unwrap()
    }

    fn long(&self, l: i64) -> ObjectRef {
        self.heap().new_instance(&self.t.value_long, &[("l", l.into())]).unwrap()
    }

    fn point(&self, x: i32, y: i32) -> ObjectRef {
        self.heap()
            .new_instance(
                &self.t.point,
                &[("x", self.int(x).into()), ("y", self.int(y).into())],
            )
            .unwrap()
    }

    fn long_point(&self, x: i64, y: i64) -> ObjectRef {
        self.heap()
            .new_instance(
                &self.t.long_point,
                &[("x", self.long(x).into()), ("y", self.long(y).into())],
            )
            .unwrap()
    }

    fn int_wrapper(&self, i: i32) -> ObjectRef {
        self.heap()
            .new_instance(&self.t.int_wrapper, &[("vti", self.int(i).into())])
            .unwrap()
    }

    fn get_int(&self, obj: &ObjectRef, path: &str) -> i32 {
        self.heap().read_int(obj, path).unwrap()
    }

    fn get_long(&self, obj: &ObjectRef, path: &str) -> i64 {
        self.heap().read_long(obj, path).unwrap()
    }

    /// `obj.name` as ordinary code reads it.
    fn field(&self, obj: &ObjectRef, name: &str) -> ObjectRef {
        match self.heap().read_field(obj, name).unwrap() {
            FieldValue::Object(o) => o,
            other => panic!("{} is not an object: {:?}", name, other),
        }
    }

    fn element(&self, array: &ObjectRef, index: usize) -> ObjectRef {
        self.heap().read_element(array, index).unwrap()
    }
}

fn for_each_config(test: impl Fn(&Setup)) {
    for config in configs() {
        test(&Setup::new(config));
    }
}

fn is_invalid<T: std::fmt::Debug>(result: Result<T, AccessError>) -> bool {
    matches!(result, Err(AccessError::InvalidArgument(_)))
}

/// The two compare-and-swap entry points, reduced to whether the swap
/// happened.
#[derive(Copy, Clone, Debug)]
enum CompareAndDo {
    Set,
    Exchange,
}

impl CompareAndDo {
    const ALL: [CompareAndDo; 2] = [CompareAndDo::Set, CompareAndDo::Exchange];

    fn execute(
        self,
        s: &Setup,
        obj: &ObjectRef,
        offset: ByteOffset,
        ty: Option<&TypeDescriptor>,
        v1: &ObjectRef,
        v2: &ObjectRef,
    ) -> Result<bool, AccessError> {
        match self {
            CompareAndDo::Set => s.u().compare_and_set_value(obj, offset, ty, v1, v2),
            CompareAndDo::Exchange => s
                .u()
                .compare_and_exchange_value(obj, offset, ty, v1, v2)
                .map(|returned| s.heap().acmp(&returned, v1)),
        }
    }
}

fn for_each_cas(test: impl Fn(&Setup, CompareAndDo)) {
    for config in configs() {
        for op in CompareAndDo::ALL {
            test(&Setup::new(config), op);
        }
    }
}

#[test]
fn test_flattened_field_is_flattened() {
    for_each_config(|s| {
        assert_eq!(s.u().is_flattened(s.t.point.field("x")).unwrap(), s.flattening);
    });
}

#[test]
fn test_flattened_array_is_flattened() {
    for_each_config(|s| {
        assert_eq!(
            s.u().is_flattened_array(s.vt_point_ary.type_descriptor().map(|t| &**t)),
            s.array_flattening
        );
    });
}

#[test]
fn test_regular_array_is_not_flattened() {
    for_each_config(|s| {
        assert!(s.t.class_point_array.is_array());
        assert!(!s.u().is_flattened_array(Some(&s.t.class_point_array)));
    });
}

#[test]
fn test_regular_field_is_not_flattened() {
    for_each_config(|s| {
        assert!(!s.u().is_flattened(s.t.class_point.field("x")).unwrap());
    });
}

#[test]
fn test_unflattenable_field_in_value_type_is_not_flattened() {
    for_each_config(|s| {
        assert!(!s.u().is_flattened(s.t.value_class_point.field("x")).unwrap());
    });
}

#[test]
fn test_flattened_object_is_not_flattened_array() {
    for_each_config(|s| {
        assert!(!s.u().is_flattened_array(Some(&s.t.point)));
    });
}

#[test]
fn test_null_is_not_flattened_array() {
    for_each_config(|s| assert!(!s.u().is_flattened_array(None)));
}

#[test]
fn test_passing_null_to_is_flattened_fails() {
    for_each_config(|s| assert!(is_invalid(s.u().is_flattened(None))));
}

#[test]
fn test_value_header_size_of_value_type() {
    for_each_config(|s| {
        let expected = if s.compressed { 4 } else { 8 };
        assert_eq!(s.u().value_header_size(Some(&s.t.point)).unwrap(), expected);
    });
}

#[test]
fn test_value_header_size_of_class_with_long_field() {
    for_each_config(|s| {
        // Compressed with flattening pads the 8-byte field, and the padding
        // counts as header.
        let expected = if s.compressed && !s.flattening { 4 } else { 8 };
        assert_eq!(
            s.u().value_header_size(Some(&s.t.with_long_field)).unwrap(),
            expected
        );
    });
}

#[test]
fn test_value_header_size_is_difference_of_object_size_and_data_size() {
    for_each_config(|s| {
        let data_size = if s.compressed { 8 } else { 16 };
        let header_size = if s.compressed { 4 } else { 8 };
        let actual = s.u().value_header_size(Some(&s.t.point)).unwrap();
        assert_eq!(actual, header_size);
        assert_eq!(actual, s.u().get_object_size(&s.vt_point).unwrap() - data_size);
    });
}

#[test]
fn test_value_header_size_of_non_value_types() {
    for_each_config(|s| {
        assert_eq!(s.u().value_header_size(Some(&s.t.class_point)).unwrap(), 0);
        assert_eq!(s.u().value_header_size(None).unwrap(), 0);
        assert_eq!(s.u().value_header_size(Some(&s.t.value_int_array)).unwrap(), 0);
        assert_eq!(s.u().value_header_size(Some(&s.t.class_point_array)).unwrap(), 0);
    });
}

#[test]
fn test_uninitialized_default_value_of_value_type() {
    for_each_config(|s| {
        s.point(1, 1);
        let p = s.u().uninitialized_default_value(Some(&s.t.point));
        assert!(!p.is_null());
        assert_eq!(s.get_int(&p, "x.i"), 0);
        assert_eq!(s.get_int(&p, "y.i"), 0);
    });
}

#[test]
fn test_uninitialized_default_value_is_null_for_other_types() {
    for_each_config(|s| {
        let u = s.u();
        assert!(u.uninitialized_default_value(Some(&s.t.class_point)).is_null());
        assert!(u.uninitialized_default_value(None).is_null());
        assert!(u.uninitialized_default_value(Some(&s.t.value_int_array)).is_null());
        assert!(u.uninitialized_default_value(Some(&s.t.class_point_array)).is_null());
    });
}

#[test]
fn test_uninitialized_value_class_has_null_default_value() {
    for_each_config(|s| {
        assert!(!s.t.never_initialized.is_initialized());
        assert!(s
            .u()
            .uninitialized_default_value(Some(&s.t.never_initialized))
            .is_null());
    });
}

#[test]
fn test_field_offsets() {
    for_each_config(|s| {
        let slot = if s.compressed { 4 } else { 8 };
        assert_eq!(s.point_x, ByteOffset(slot));
        assert_eq!(s.point_y, ByteOffset(2 * slot));
        assert_eq!(s.int_wrapper_vti, ByteOffset(2 * slot));
        assert_eq!(s.int_ary_0, ByteOffset(s.runtime.engine().array_header_size()));
        assert_eq!(
            s.point_ary_1.as_usize() - s.point_ary_0.as_usize(),
            s.u().array_index_scale(&s.t.point_array).unwrap()
        );
    });
}

#[test]
fn test_null_obj_get_value() {
    for_each_config(|s| {
        assert!(is_invalid(s.u().get_value(&ObjectRef::NULL, ByteOffset(0), Some(&s.t.value_int))));
    });
}

#[test]
fn test_null_type_get_value() {
    for_each_config(|s| {
        let result = s.u().get_value(&s.vt_point, s.point_x, None);
        if s.flattening {
            assert!(is_invalid(result));
        } else {
            assert_eq!(result.unwrap(), s.field(&s.vt_point, "x"));
        }
    });
}

#[test]
fn test_non_value_type_get_value() {
    for_each_config(|s| {
        assert!(s
            .u()
            .get_value(&s.vt_point, s.int_wrapper_vti, Some(&s.t.int_wrapper))
            .unwrap()
            .is_null());
    });
}

#[test]
fn test_get_values_of_array() {
    for_each_config(|s| {
        for (index, offset) in [(0, s.point_ary_0), (1, s.point_ary_1)] {
            let p = s
                .u()
                .get_value(&s.vt_point_ary, offset, Some(&s.t.point))
                .unwrap();
            let expected = s.element(&s.vt_point_ary, index);
            assert_eq!(s.get_int(&p, "x.i"), s.get_int(&expected, "x.i"));
            assert_eq!(s.get_int(&p, "y.i"), s.get_int(&expected, "y.i"));
        }
        assert_eq!(s.get_int(&s.element(&s.vt_point_ary, 1), "y.i"), 20);
    });
}

#[test]
fn test_get_value_of_zero_size_array_does_not_fail() {
    for_each_config(|s| {
        let elements = [
            s.heap().new_instance(&s.t.zero_size, &[]).unwrap(),
            s.heap().new_instance(&s.t.zero_size, &[]).unwrap(),
        ];
        let array = s
            .heap()
            .new_array_from(&s.t.zero_size_array, &elements)
            .unwrap();
        let offset = s.u().array_base_offset(Some(&s.t.zero_size_array)).unwrap();
        assert!(!s
            .u()
            .get_value(&array, offset, Some(&s.t.zero_size))
            .unwrap()
            .is_null());
    });
}

#[test]
fn test_get_value_of_zero_size_field_does_not_fail() {
    for_each_config(|s| {
        let wrapper = s.heap().new_instance(&s.t.zero_size_wrapper, &[]).unwrap();
        let offset = s
            .u()
            .object_field_offset(&s.t.zero_size_wrapper, "z")
            .unwrap();
        assert!(!s
            .u()
            .get_value(&wrapper, offset, Some(&s.t.zero_size))
            .unwrap()
            .is_null());
    });
}

#[test]
fn test_get_values_of_object() {
    for_each_config(|s| {
        let u = s.u();
        let x = u.get_value(&s.vt_point, s.point_x, Some(&s.t.value_int)).unwrap();
        let y = u.get_value(&s.vt_point, s.point_y, Some(&s.t.value_int)).unwrap();
        assert_eq!(s.get_int(&x, "i"), 7);
        assert_eq!(s.get_int(&y, "i"), 8);
        if !s.flattening {
            assert_eq!(x, s.field(&s.vt_point, "x"));
        }
    });
}

#[test]
fn test_get_value_on_value_type_with_long_fields() {
    for_each_config(|s| {
        let point = s.long_point(123, 456);
        let u = s.u();
        let x = u.get_value(&point, s.long_point_x, Some(&s.t.value_long)).unwrap();
        let y = u.get_value(&point, s.long_point_y, Some(&s.t.value_long)).unwrap();
        assert_eq!(s.get_long(&x, "l"), s.get_long(&point, "x.l"));
        assert_eq!(s.get_long(&y, "l"), s.get_long(&point, "y.l"));
        assert_eq!(s.get_long(&point, "x.l"), 123);
        assert_eq!(s.get_long(&point, "y.l"), 456);
    });
}

#[test]
fn test_get_value_on_identity_object() {
    for_each_config(|s| {
        let wrapper = s.int_wrapper(7);
        let vti = s
            .u()
            .get_value(&wrapper, s.int_wrapper_vti, Some(&s.t.value_int))
            .unwrap();
        assert_eq!(s.get_int(&vti, "i"), s.get_int(&wrapper, "vti.i"));
        assert_eq!(s.get_int(&wrapper, "vti.i"), 7);
    });
}

#[test]
fn test_null_obj_put_value() {
    for_each_config(|s| {
        assert!(is_invalid(s.u().put_value(
            &ObjectRef::NULL,
            s.point_x,
            Some(&s.t.value_int),
            &s.int(1)
        )));
    });
}

#[test]
fn test_null_type_put_value() {
    for_each_config(|s| {
        let result = s.u().put_value(&s.vt_point, s.point_x, None, &s.int(1));
        if s.flattening {
            assert!(is_invalid(result));
        } else {
            result.unwrap();
        }
        assert_eq!(s.get_int(&s.vt_point, "x.i"), 7);
    });
}

#[test]
fn test_null_value_put_value() {
    for_each_config(|s| {
        let result = s
            .u()
            .put_value(&s.vt_point, s.point_x, Some(&s.t.value_int), &ObjectRef::NULL);
        if s.flattening {
            assert!(is_invalid(result));
        } else {
            result.unwrap();
        }
        assert_eq!(s.get_int(&s.vt_point, "x.i"), 7);
    });
}

#[test]
fn test_put_value_with_identity_type_and_value() {
    for_each_config(|s| {
        let before = s.get_int(&s.vt_point, "x.i");
        assert_ne!(before, 10000);
        s.u()
            .put_value(&s.vt_point, s.point_x, Some(&s.t.int_wrapper), &s.int_wrapper(10000))
            .unwrap();
        assert_eq!(s.get_int(&s.vt_point, "x.i"), before);
    });
}

#[test]
fn test_put_value_with_identity_type_but_value_object() {
    for_each_config(|s| {
        let before = s.get_int(&s.vt_point, "x.i");
        assert_ne!(before, 10000);
        s.u()
            .put_value(&s.vt_point, s.point_x, Some(&s.t.int_wrapper), &s.int(10000))
            .unwrap();
        assert_eq!(s.get_int(&s.vt_point, "x.i"), before);
    });
}

#[test]
fn test_put_value_on_identity_object() {
    for_each_config(|s| {
        let wrapper = s.int_wrapper(7);
        let value = s.int(5892);
        s.u()
            .put_value(&wrapper, s.int_wrapper_vti, Some(&s.t.value_int), &value)
            .unwrap();
        assert_eq!(s.get_int(&wrapper, "vti.i"), s.get_int(&value, "i"));
        assert_eq!(s.get_int(&value, "i"), 5892);
    });
}

#[test]
fn test_put_values_of_array() {
    for_each_config(|s| {
        let p = s.point(34857, 784382);
        for (index, offset) in [(0, s.point_ary_0), (1, s.point_ary_1)] {
            s.u()
                .put_value(&s.vt_point_ary, offset, Some(&s.t.point), &p)
                .unwrap();
            let element = s.element(&s.vt_point_ary, index);
            assert_eq!(s.get_int(&element, "x.i"), s.get_int(&p, "x.i"));
            assert_eq!(s.get_int(&element, "y.i"), s.get_int(&p, "y.i"));
        }
        assert_eq!(s.get_int(&p, "x.i"), 34857);
        assert_eq!(s.get_int(&p, "y.i"), 784382);
    });
}

#[test]
fn test_put_value_with_zero_size_array_does_not_fail() {
    for_each_config(|s| {
        let elements = [
            s.heap().new_instance(&s.t.zero_size, &[]).unwrap(),
            s.heap().new_instance(&s.t.zero_size, &[]).unwrap(),
        ];
        for ty in [&s.t.nullable_zero_size_array, &s.t.zero_size_array] {
            let array = s.heap().new_array_from(ty, &elements).unwrap();
            let offset = s.u().array_base_offset(Some(ty)).unwrap();
            let value = s.heap().new_instance(&s.t.zero_size, &[]).unwrap();
            s.u()
                .put_value(&array, offset, Some(&s.t.zero_size), &value)
                .unwrap();
            assert!(!s.element(&array, 1).is_null());
        }
    });
}

#[test]
fn test_put_value_of_zero_size_field_does_not_fail() {
    for_each_config(|s| {
        let wrapper = s.heap().new_instance(&s.t.zero_size_wrapper, &[]).unwrap();
        let offset = s
            .u()
            .object_field_offset(&s.t.zero_size_wrapper, "z")
            .unwrap();
        let value = s.heap().new_instance(&s.t.zero_size, &[]).unwrap();
        s.u()
            .put_value(&wrapper, offset, Some(&s.t.zero_size), &value)
            .unwrap();
    });
}

#[test]
fn test_put_values_of_object() {
    for_each_config(|s| {
        let value = s.int(47538);
        let u = s.u();
        u.put_value(&s.vt_point, s.point_x, Some(&s.t.value_int), &value)
            .unwrap();
        u.put_value(&s.vt_point, s.point_y, Some(&s.t.value_int), &value)
            .unwrap();
        assert_eq!(s.get_int(&s.vt_point, "x.i"), 47538);
        assert_eq!(s.get_int(&s.vt_point, "y.i"), 47538);
        assert_eq!(s.get_int(&value, "i"), 47538);
    });
}

#[test]
fn test_put_value_on_value_type_with_long_fields() {
    for_each_config(|s| {
        let point = s.long_point(123, 456);
        let value = s.long(23427);
        let u = s.u();
        u.put_value(&point, s.long_point_x, Some(&s.t.value_long), &value)
            .unwrap();
        u.put_value(&point, s.long_point_y, Some(&s.t.value_long), &value)
            .unwrap();
        assert_eq!(s.get_long(&point, "x.l"), 23427);
        assert_eq!(s.get_long(&point, "y.l"), 23427);
        assert_eq!(s.get_long(&value, "l"), 23427);
    });
}

#[test]
fn test_get_size_of_value_type() {
    for_each_config(|s| {
        let expected = if s.compressed { 12 } else { 24 };
        assert_eq!(s.u().get_object_size(&s.vt_point).unwrap(), expected);
    });
}

#[test]
fn test_get_size_of_identity_type() {
    for_each_config(|s| {
        let expected = if s.compressed { 16 } else { 24 };
        assert_eq!(s.u().get_object_size(&s.int_wrapper(5)).unwrap(), expected);
    });
}

#[test]
fn test_get_size_of_value_type_with_long_fields() {
    for_each_config(|s| {
        let expected = if s.compressed && !s.flattening { 12 } else { 24 };
        assert_eq!(
            s.u().get_object_size(&s.long_point(123, 456)).unwrap(),
            expected
        );
    });
}

#[test]
fn test_get_size_of_array() {
    for_each_config(|s| {
        let adjustment = if s.dual_header_gencon { 8 } else { 0 };
        let expected = (if s.compressed { 24 } else { 40 }) - adjustment;
        assert_eq!(s.u().get_object_size(&s.vt_int_ary).unwrap(), expected);
    });
}

#[test]
fn test_get_size_of_zero_size_value_type() {
    for_each_config(|s| {
        let zero = s.heap().new_instance(&s.t.zero_size, &[]).unwrap();
        let expected = if s.compressed { 4 } else { 8 };
        assert_eq!(s.u().get_object_size(&zero).unwrap(), expected);
    });
}

#[test]
fn test_get_size_of_null_fails() {
    for_each_config(|s| assert!(is_invalid(s.u().get_object_size(&ObjectRef::NULL))));
}

#[test]
fn test_compare_and_set_null_obj() {
    for_each_cas(|s, op| {
        let x = s.field(&s.vt_point, "x");
        assert!(is_invalid(op.execute(
            s,
            &ObjectRef::NULL,
            s.point_x,
            Some(&s.t.value_int),
            &x,
            &s.int(1)
        )));
    });
}

#[test]
fn test_compare_and_set_null_type() {
    for_each_cas(|s, op| {
        let x = s.field(&s.vt_point, "x");
        let result = op.execute(s, &s.vt_point, s.point_x, None, &x, &s.int(1));
        if s.flattening {
            assert!(is_invalid(result), "{:?}", op);
        } else {
            assert!(result.unwrap());
            assert_eq!(s.get_int(&s.vt_point, "x.i"), 1);
        }
    });
}

#[test]
fn test_compare_and_set_null_expected() {
    for_each_cas(|s, op| {
        let original = s.get_int(&s.vt_point, "x.i");
        let success = op
            .execute(s, &s.vt_point, s.point_x, Some(&s.t.value_int), &ObjectRef::NULL, &s.int(1))
            .unwrap();
        assert!(!success);
        assert_eq!(s.get_int(&s.vt_point, "x.i"), original);
    });
}

#[test]
fn test_compare_and_set_null_update() {
    for_each_cas(|s, op| {
        let original = s.get_int(&s.vt_point, "x.i");
        let success = op
            .execute(
                s,
                &s.vt_point,
                s.point_x,
                Some(&s.t.value_int),
                &s.int(original + 1),
                &ObjectRef::NULL,
            )
            .unwrap();
        assert!(!success);
        assert_eq!(s.get_int(&s.vt_point, "x.i"), original);

        let x = s.field(&s.vt_point, "x");
        let result = op.execute(s, &s.vt_point, s.point_x, Some(&s.t.value_int), &x, &ObjectRef::NULL);
        if s.flattening {
            assert!(is_invalid(result));
        } else {
            assert!(result.unwrap());
            assert!(s.field(&s.vt_point, "x").is_null());
        }
    });
}

#[test]
fn test_compare_and_set_point_success() {
    for_each_cas(|s, op| {
        for (name, offset) in [("x", s.point_x), ("y", s.point_y)] {
            let current = s.field(&s.vt_point, name);
            let update = s.int(328);
            let success = op
                .execute(s, &s.vt_point, offset, Some(&s.t.value_int), &current, &update)
                .unwrap();
            assert_eq!(s.get_int(&update, "i"), 328);
            assert!(success, "{:?} on {}", op, name);
            assert_eq!(s.get_int(&s.vt_point, &format!("{}.i", name)), 328);
        }
    });
}

#[test]
fn test_compare_and_set_point_failure() {
    for_each_cas(|s, op| {
        for (name, offset) in [("x", s.point_x), ("y", s.point_y)] {
            let path = format!("{}.i", name);
            let original = s.get_int(&s.vt_point, &path);
            let update = s.int(328);
            let success = op
                .execute(
                    s,
                    &s.vt_point,
                    offset,
                    Some(&s.t.value_int),
                    &s.int(original + 1),
                    &update,
                )
                .unwrap();
            assert_eq!(s.get_int(&update, "i"), 328);
            assert!(!success);
            assert_eq!(s.get_int(&s.vt_point, &path), original);
        }
    });
}

#[test]
fn test_compare_and_set_array_success() {
    for_each_cas(|s, op| {
        for (index, offset) in [(0, s.int_ary_0), (1, s.int_ary_1)] {
            let current = s.element(&s.vt_int_ary, index);
            let update = s.int(456);
            let success = op
                .execute(s, &s.vt_int_ary, offset, Some(&s.t.value_int), &current, &update)
                .unwrap();
            assert_eq!(s.get_int(&update, "i"), 456);
            assert!(success);
            assert_eq!(s.get_int(&s.element(&s.vt_int_ary, index), "i"), 456);
        }
    });
}

#[test]
fn test_compare_and_set_array_failure() {
    for_each_cas(|s, op| {
        for (index, offset) in [(0, s.int_ary_0), (1, s.int_ary_1)] {
            let original = s.get_int(&s.element(&s.vt_int_ary, index), "i");
            let success = op
                .execute(
                    s,
                    &s.vt_int_ary,
                    offset,
                    Some(&s.t.value_int),
                    &s.int(original + 1),
                    &s.int(328),
                )
                .unwrap();
            assert!(!success);
            assert_eq!(s.get_int(&s.element(&s.vt_int_ary, index), "i"), original);
        }
    });
}

#[test]
fn test_compare_and_set_on_value_type_with_long_fields() {
    for_each_cas(|s, op| {
        let point = s.long_point(123, 456);
        assert_eq!(s.get_long(&point, "x.l"), 123);
        assert_eq!(s.get_long(&point, "y.l"), 456);

        let current = s.field(&point, "x");
        let update = s.long(372);
        let success = op
            .execute(s, &point, s.long_point_x, Some(&s.t.value_long), &current, &update)
            .unwrap();
        assert_eq!(s.get_long(&update, "l"), 372);
        assert!(success);
        assert_eq!(s.get_long(&point, "x.l"), 372);
        assert_eq!(s.get_long(&point, "y.l"), 456);
    });
}

#[test]
fn test_compare_and_set_wrong_type() {
    for_each_cas(|s, op| {
        let original = s.get_int(&s.vt_point, "x.i");
        let current = s.field(&s.vt_point, "x");
        let update = s.int(328);
        let success = op
            .execute(s, &s.vt_point, s.point_x, Some(&s.t.value_int2), &current, &update)
            .unwrap();
        if s.flattening {
            assert!(!success);
            assert_eq!(s.get_int(&s.vt_point, "x.i"), original);
        } else {
            assert!(success);
            assert_eq!(s.get_int(&s.vt_point, "x.i"), 328);
        }
    });
}

#[test]
fn test_compare_and_set_update_of_other_type_fails_when_flattened() {
    for_each_cas(|s, op| {
        if !s.flattening {
            return;
        }
        let current = s.field(&s.vt_point, "x");
        let success = op
            .execute(s, &s.vt_point, s.point_x, Some(&s.t.value_int), &current, &s.int2(1))
            .unwrap();
        assert!(!success);
        assert_eq!(s.get_int(&s.vt_point, "x.i"), 7);
    });
}

#[test]
fn test_get_and_set_null_obj() {
    for_each_config(|s| {
        assert!(is_invalid(s.u().get_and_set_value(
            &ObjectRef::NULL,
            s.point_x,
            Some(&s.t.value_int),
            &s.int(1)
        )));
    });
}

#[test]
fn test_get_and_set_null_type() {
    for_each_config(|s| {
        let original = s.get_int(&s.vt_point, "x.i");
        let result = s.u().get_and_set_value(&s.vt_point, s.point_x, None, &s.int(1));
        if s.flattening {
            assert!(is_invalid(result));
        } else {
            assert_eq!(s.get_int(&result.unwrap(), "i"), original);
            assert_eq!(s.get_int(&s.vt_point, "x.i"), 1);
        }
    });
}

#[test]
fn test_get_and_set_null_value() {
    for_each_config(|s| {
        let original = s.get_int(&s.vt_point, "x.i");
        let result =
            s.u()
                .get_and_set_value(&s.vt_point, s.point_x, Some(&s.t.value_int), &ObjectRef::NULL);
        if s.flattening {
            assert!(is_invalid(result));
        } else {
            assert_eq!(s.get_int(&result.unwrap(), "i"), original);
            assert!(s.field(&s.vt_point, "x").is_null());
        }
    });
}

#[test]
fn test_get_and_set_point() {
    for_each_config(|s| {
        for (name, offset) in [("x", s.point_x), ("y", s.point_y)] {
            let path = format!("{}.i", name);
            let original = s.get_int(&s.vt_point, &path);
            let update = s.int(328);
            let result = s
                .u()
                .get_and_set_value(&s.vt_point, offset, Some(&s.t.value_int), &update)
                .unwrap();
            assert_eq!(s.get_int(&update, "i"), 328);
            assert_eq!(s.get_int(&result, "i"), original);
            assert_eq!(s.get_int(&s.vt_point, &path), 328);
        }
    });
}

#[test]
fn test_get_and_set_array() {
    for_each_config(|s| {
        for (index, offset) in [(0, s.int_ary_0), (1, s.int_ary_1)] {
            let original = s.get_int(&s.element(&s.vt_int_ary, index), "i");
            let update = s.int(456);
            let result = s
                .u()
                .get_and_set_value(&s.vt_int_ary, offset, Some(&s.t.value_int), &update)
                .unwrap();
            assert_eq!(s.get_int(&result, "i"), original);
            assert_eq!(s.get_int(&s.element(&s.vt_int_ary, index), "i"), 456);
        }
    });
}

#[test]
fn test_get_and_set_on_value_type_with_long_fields() {
    for_each_config(|s| {
        let point = s.long_point(123, 456);
        let update = s.long(372);
        let result = s
            .u()
            .get_and_set_value(&point, s.long_point_x, Some(&s.t.value_long), &update)
            .unwrap();
        assert_eq!(s.get_long(&update, "l"), 372);
        assert_eq!(s.get_long(&result, "l"), 123);
        assert_eq!(s.get_long(&point, "x.l"), 372);
    });
}

#[test]
fn test_offset_inside_a_field_is_rejected() {
    for_each_config(|s| {
        let inside = s.point_x + 1;
        assert!(is_invalid(s.u().get_value(&s.vt_point, inside, Some(&s.t.value_int))));
        let past_end = ByteOffset(s.u().get_object_size(&s.vt_int_ary).unwrap());
        assert!(is_invalid(s.u().get_value(&s.vt_int_ary, past_end, Some(&s.t.value_int))));
    });
}
