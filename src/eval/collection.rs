//! Collection member functions: `contains`, `shuffle`, `shuffled`.

use rand::seq::SliceRandom;
use std::rc::Rc;
use tracing::debug;

use crate::registry::{MemberCall, MemberFn};
use crate::value::Value;
use crate::{EvalError, EvalResult};

pub fn handlers() -> Vec<(&'static str, MemberFn)> {
    vec![
        ("contains", Rc::new(contains) as MemberFn),
        ("shuffle", Rc::new(shuffle) as MemberFn),
        ("shuffled", Rc::new(shuffled) as MemberFn),
    ]
}

/// `container.contains(element)`. Arrays compare elements structurally;
/// strings test for a substring.
pub fn contains(call: &mut MemberCall<'_>) -> EvalResult<Value> {
    let [element] = call.arguments.as_slice() else {
        return Err(EvalError::invalid_arguments(format!(
            "contains() takes exactly one argument, got {}",
            call.arguments.len()
        )));
    };
    match (&call.receiver, &element.value) {
        (Value::Array(items), element) => Ok(Value::Bool(items.contains(element))),
        (Value::String(haystack), Value::String(needle)) => {
            Ok(Value::Bool(haystack.contains(needle.as_str())))
        }
        (Value::String(_), other) => Err(EvalError::invalid_arguments(format!(
            "String.contains() expects a String, got {}",
            other.type_name()
        ))),
        (other, _) => Err(EvalError::invalid_arguments(format!(
            "contains() requires a container, got {}",
            other.type_name()
        ))),
    }
}

/// Permute the receiver's binding in place and return the new array.
pub fn shuffle(call: &mut MemberCall<'_>) -> EvalResult<Value> {
    call.expect_no_arguments()?;
    let mut items = array_receiver(call)?.to_vec();
    items.shuffle(&mut *call.rng);
    let shuffled = Value::Array(items);
    call.write_back(shuffled.clone())?;
    if let Some(place) = &call.place {
        debug!("shuffled `{}` in place", place.name);
    }
    Ok(shuffled)
}

/// Permuted copy of the receiver; the receiver is left untouched.
pub fn shuffled(call: &mut MemberCall<'_>) -> EvalResult<Value> {
    call.expect_no_arguments()?;
    let mut items = array_receiver(call)?.to_vec();
    items.shuffle(&mut *call.rng);
    Ok(Value::Array(items))
}

fn array_receiver<'a>(call: &'a MemberCall<'_>) -> EvalResult<&'a [Value]> {
    call.receiver.as_array().ok_or_else(|| {
        EvalError::invalid_arguments(format!(
            "{}() requires an array, got {}",
            call.name,
            call.receiver.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::registry::Place;
    use crate::scope::Scopes;
    use crate::value::ResolvedArgument;

    fn call<'a>(
        name: &'a str,
        receiver: Value,
        place: Option<Place>,
        arguments: Vec<ResolvedArgument>,
        scopes: &'a mut Scopes,
        rng: &'a mut StdRng,
    ) -> MemberCall<'a> {
        MemberCall {
            name,
            receiver,
            place,
            arguments,
            scopes,
            rng,
        }
    }

    fn sorted(value: &Value) -> Vec<i64> {
        let mut items: Vec<i64> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| match v {
                Value::Int(i) => *i,
                other => panic!("unexpected element {:?}", other),
            })
            .collect();
        items.sort_unstable();
        items
    }

    #[test]
    fn test_contains_array() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(0);
        let receiver = Value::from(vec![1i64, 2, 3]);
        let arguments = vec![ResolvedArgument::positional(Value::Int(2))];
        let mut c = call("contains", receiver, None, arguments, &mut scopes, &mut rng);
        assert_eq!(contains(&mut c).unwrap(), Value::Bool(true));

        c.arguments = vec![ResolvedArgument::positional(Value::Double(2.0))];
        assert_eq!(contains(&mut c).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_contains_empty_is_false() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(0);
        let arguments = vec![ResolvedArgument::positional(Value::Int(1))];
        let mut c = call(
            "contains",
            Value::Array(vec![]),
            None,
            arguments,
            &mut scopes,
            &mut rng,
        );
        assert_eq!(contains(&mut c).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_contains_arity_and_receiver() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut c = call(
            "contains",
            Value::from(vec![1i64]),
            None,
            vec![],
            &mut scopes,
            &mut rng,
        );
        assert!(matches!(contains(&mut c), Err(EvalError::InvalidArguments(_))));

        c.arguments = vec![
            ResolvedArgument::positional(Value::Int(1)),
            ResolvedArgument::positional(Value::Int(2)),
        ];
        assert!(matches!(contains(&mut c), Err(EvalError::InvalidArguments(_))));

        c.receiver = Value::Int(7);
        c.arguments = vec![ResolvedArgument::positional(Value::Int(7))];
        assert!(matches!(contains(&mut c), Err(EvalError::InvalidArguments(_))));
    }

    #[test]
    fn test_contains_substring() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(0);
        let arguments = vec![ResolvedArgument::positional(Value::from("ell"))];
        let mut c = call(
            "contains",
            Value::from("hello"),
            None,
            arguments,
            &mut scopes,
            &mut rng,
        );
        assert_eq!(contains(&mut c).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_shuffle_writes_back_and_notifies_once() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(7);
        let model = scopes.new_instance(None).unwrap();
        let instance = model.scope();
        let original = Value::from(vec![1i64, 2, 3, 4, 5]);
        scopes.define(instance, "arr", original.clone()).unwrap();
        let count = Rc::new(Cell::new(0));
        let observed = count.clone();
        scopes
            .on_mutation(instance, move || observed.set(observed.get() + 1))
            .unwrap();

        let place = Some(Place::new(instance, "arr"));
        let mut c = call("shuffle", original, place, vec![], &mut scopes, &mut rng);
        let result = shuffle(&mut c).unwrap();

        assert_eq!(count.get(), 1);
        assert_eq!(scopes.get(instance, "arr"), Some(result.clone()));
        assert_eq!(sorted(&result), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_shuffle_requires_binding() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut c = call(
            "shuffle",
            Value::from(vec![1i64, 2]),
            None,
            vec![],
            &mut scopes,
            &mut rng,
        );
        assert!(matches!(shuffle(&mut c), Err(EvalError::InvalidArguments(_))));
    }

    #[test]
    fn test_shuffle_rejects_arguments_and_non_arrays() {
        let mut scopes = Scopes::default();
        let global = scopes.global();
        scopes.define(global, "n", Value::Int(3)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut c = call(
            "shuffle",
            Value::Int(3),
            Some(Place::new(global, "n")),
            vec![],
            &mut scopes,
            &mut rng,
        );
        assert!(matches!(shuffle(&mut c), Err(EvalError::InvalidArguments(_))));

        c.receiver = Value::from(vec![1i64]);
        c.arguments = vec![ResolvedArgument::positional(Value::Int(1))];
        assert!(matches!(shuffle(&mut c), Err(EvalError::InvalidArguments(_))));
        assert!(matches!(shuffled(&mut c), Err(EvalError::InvalidArguments(_))));
    }

    #[test]
    fn test_shuffled_leaves_binding_alone() {
        let mut scopes = Scopes::default();
        let mut rng = StdRng::seed_from_u64(11);
        let model = scopes.new_instance(None).unwrap();
        let instance = model.scope();
        let original = Value::from(vec![1i64, 2, 3, 4, 5, 6]);
        scopes.define(instance, "arr", original.clone()).unwrap();
        let count = Rc::new(Cell::new(0));
        let observed = count.clone();
        scopes
            .on_mutation(instance, move || observed.set(observed.get() + 1))
            .unwrap();

        let place = Some(Place::new(instance, "arr"));
        let mut c = call("shuffled", original.clone(), place, vec![], &mut scopes, &mut rng);
        let result = shuffled(&mut c).unwrap();

        assert_eq!(sorted(&result), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(count.get(), 0);
        assert_eq!(scopes.get(instance, "arr"), Some(original));
    }

    #[test]
    fn test_seeded_permutation_is_reproducible() {
        let run = |seed| {
            let mut scopes = Scopes::default();
            let mut rng = StdRng::seed_from_u64(seed);
            let receiver = Value::from((1..=20).collect::<Vec<i64>>());
            let mut c = call("shuffled", receiver, None, vec![], &mut scopes, &mut rng);
            shuffled(&mut c).unwrap()
        };
        assert_eq!(run(42), run(42));
    }
}
