use crate::spec::resource::Resource;
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid quantity for {0}: {1}")]
    InvalidQuantity(String, String),
}

/// Parses a kubernetes quantity string and returns it multiplied by 10^scale,
/// rounded up. Handles plain and fractional numbers, the decimal suffixes
/// (n, u, m, k, M, G, T, P, E), the binary suffixes (Ki .. Ei) and the
/// exponent form (1e3).
fn parse_scaled(quantity: &str, scale: i32) -> Option<i64> {
    let s = quantity.trim();
    let s = s.strip_prefix('+').unwrap_or(s);

    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(split);

    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
        return None;
    }

    let mantissa = format!("{}{}", whole, frac).parse::<u128>().ok()?;
    let mut exp10 = i32::try_from(frac.len()).ok()?.checked_neg()?;
    let mut multiplier: u128 = 1;

    match suffix {
        "" => {}
        "Ki" => multiplier = 1 << 10,
        "Mi" => multiplier = 1 << 20,
        "Gi" => multiplier = 1 << 30,
        "Ti" => multiplier = 1 << 40,
        "Pi" => multiplier = 1 << 50,
        "Ei" => multiplier = 1 << 60,
        "n" => exp10 -= 9,
        "u" => exp10 -= 6,
        "m" => exp10 -= 3,
        "k" => exp10 += 3,
        "M" => exp10 += 6,
        "G" => exp10 += 9,
        "T" => exp10 += 12,
        "P" => exp10 += 15,
        "E" => exp10 += 18,
        _ => {
            let exponent = suffix
                .strip_prefix('e')
                .or_else(|| suffix.strip_prefix('E'))?;
            exp10 = exp10.checked_add(exponent.parse::<i32>().ok()?)?;
        }
    }

    let value = mantissa.checked_mul(multiplier)?;
    let exp = exp10.checked_add(scale)?;
    let scaled = if exp >= 0 {
        value.checked_mul(10u128.checked_pow(exp as u32)?)?
    } else {
        match 10u128.checked_pow(exp.unsigned_abs()) {
            Some(divisor) => value.div_ceil(divisor),
            // anything this small rounds up to a single unit
            None => u128::from(value > 0),
        }
    };

    i64::try_from(scaled).ok()
}

/// Parses a quantity in the unit the named resource is accounted in:
/// millis for cpu, whole units (bytes, counts) for everything else.
pub fn parse_quantity(resource_name: &str, quantity: &Quantity) -> Result<i64, Error> {
    let scale = if resource_name == "cpu" { 3 } else { 0 };
    parse_scaled(&quantity.0, scale)
        .ok_or_else(|| Error::InvalidQuantity(resource_name.to_string(), quantity.0.clone()))
}

/// Aggregates what a pod asks for in one scheduling cycle.
///
/// Regular containers run side by side so their requests add up. Init containers
/// run one after another before them, so each only has to fit on its own: the
/// total is the element-wise max of the running sum and every init container.
/// Pod overhead is added on top.
pub fn get_requests(p: &PodSpec) -> Result<Resource, Error> {
    let mut result = Resource::default();

    for c in &p.containers {
        if let Some(requests) = c.resources.as_ref().and_then(|r| r.requests.as_ref()) {
            result.add(&Resource::from_resource_list(requests)?);
        }
    }

    for c in p.init_containers.iter().flatten() {
        if let Some(requests) = c.resources.as_ref().and_then(|r| r.requests.as_ref()) {
            result.set_max(&Resource::from_resource_list(requests)?);
        }
    }

    if let Some(overhead) = &p.overhead {
        result.add(&Resource::from_resource_list(overhead)?);
    }

    // pods is a node capacity, never part of a request
    result.allowed_pod_number = 0;

    Ok(result)
}

/// uid of the first owner reference, if the pod has one
pub fn owner_uid(pod: &Pod) -> Option<&str> {
    pod.metadata
        .owner_references
        .as_ref()
        .and_then(|refs| refs.first())
        .map(|r| r.uid.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::objects::{WithOwner, pod, resources};
    use k8s_openapi::api::core::v1::{Container, ResourceRequirements};
    use std::collections::BTreeMap;

    #[test]
    fn should_parse_cpu_quantity() -> Result<(), super::Error> {
        assert_eq!(parse_quantity("cpu", &Quantity("200m".to_string()))?, 200);
        assert_eq!(parse_quantity("cpu", &Quantity("1".to_string()))?, 1000);
        assert_eq!(parse_quantity("cpu", &Quantity("500".to_string()))?, 500000);
        assert_eq!(parse_quantity("cpu", &Quantity("2".to_string()))?, 2000);
        assert_eq!(parse_quantity("cpu", &Quantity("1.5".to_string()))?, 1500);
        assert_eq!(parse_quantity("cpu", &Quantity("0.1".to_string()))?, 100);
        // sub-milli values round up
        assert_eq!(parse_quantity("cpu", &Quantity("100u".to_string()))?, 1);
        assert_eq!(parse_quantity("cpu", &Quantity("1e3".to_string()))?, 1_000_000);

        let result = parse_quantity("cpu", &Quantity("invalid".to_string()));
        assert!(result.is_err());
        dbg!(&result);

        assert!(parse_quantity("cpu", &Quantity("-1".to_string())).is_err());
        assert!(parse_quantity("cpu", &Quantity("".to_string())).is_err());
        assert!(parse_quantity("cpu", &Quantity("1.2.3".to_string())).is_err());

        Ok(())
    }

    #[test]
    fn should_parse_memory_quantity() -> Result<(), super::Error> {
        assert_eq!(
            parse_quantity("memory", &Quantity("200Mi".to_string()))?,
            200 * 1024 * 1024
        );
        assert_eq!(
            parse_quantity("memory", &Quantity("1Gi".to_string()))?,
            1024 * 1024 * 1024
        );
        assert_eq!(
            parse_quantity("memory", &Quantity("1.5Gi".to_string()))?,
            1536 * 1024 * 1024
        );
        assert_eq!(
            parse_quantity("memory", &Quantity("2Ti".to_string()))?,
            2 * 1024 * 1024 * 1024 * 1024
        );
        assert_eq!(
            parse_quantity("memory", &Quantity("200M".to_string()))?,
            200 * 1000 * 1000
        );
        assert_eq!(
            parse_quantity("memory", &Quantity("500k".to_string()))?,
            500 * 1000
        );
        assert_eq!(parse_quantity("memory", &Quantity("1500m".to_string()))?, 2);
        assert_eq!(parse_quantity("memory", &Quantity("12345".to_string()))?, 12345);

        let result = parse_quantity("memory", &Quantity("200MiB".to_string()));
        assert!(result.is_err());
        dbg!(&result);

        // does not fit in an i64
        assert!(parse_quantity("memory", &Quantity("100Ei".to_string())).is_err());

        Ok(())
    }

    #[test]
    fn should_reject_exponent_out_of_range() {
        assert_eq!(
            parse_quantity("cpu", &Quantity("1e2147483647".to_string())),
            Err(Error::InvalidQuantity("cpu".to_string(), "1e2147483647".to_string()))
        );
        assert!(parse_quantity("memory", &Quantity("1.5e-2147483648".to_string())).is_err());
        assert!(parse_quantity("memory", &Quantity("1e99999999999".to_string())).is_err());
        // tiny but representable exponents still round up
        assert_eq!(parse_quantity("memory", &Quantity("1e-2147483647".to_string())), Ok(1));
    }

    #[test]
    fn should_sum_containers() -> Result<(), super::Error> {
        let pod_spec = PodSpec {
            containers: vec![
                Container {
                    name: "app".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources(&[("cpu", "200m"), ("memory", "200Mi")])),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Container {
                    name: "sidecar".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources(&[
                            ("cpu", "100m"),
                            ("ephemeral-storage", "1Gi"),
                            ("example.com/gpu", "1"),
                        ])),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Container {
                    name: "no-requests".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let requests = get_requests(&pod_spec)?;
        assert_eq!(requests.milli_cpu, 300);
        assert_eq!(requests.memory, 200 * 1024 * 1024);
        assert_eq!(requests.ephemeral_storage, 1024 * 1024 * 1024);
        assert_eq!(requests.scalar_resources.get("example.com/gpu"), Some(&1));

        Ok(())
    }

    #[test]
    fn should_take_max_of_init_containers_and_add_overhead() -> Result<(), super::Error> {
        let pod_spec = PodSpec {
            containers: vec![
                Container {
                    name: "a".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources(&[("cpu", "500m"), ("memory", "100Mi")])),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Container {
                    name: "b".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources(&[("cpu", "500m"), ("memory", "100Mi")])),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            init_containers: Some(vec![
                Container {
                    name: "migrate".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources(&[("cpu", "2"), ("memory", "50Mi")])),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Container {
                    name: "warm-cache".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(resources(&[("memory", "1Gi")])),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ]),
            overhead: Some(resources(&[("cpu", "250m"), ("memory", "10Mi")])),
            ..Default::default()
        };

        let requests = get_requests(&pod_spec)?;
        // max(500m + 500m, 2, 0) + 250m
        assert_eq!(requests.milli_cpu, 2250);
        // max(200Mi, 50Mi, 1Gi) + 10Mi
        assert_eq!(requests.memory, (1024 + 10) * 1024 * 1024);

        Ok(())
    }

    #[test]
    fn should_return_zero_request_for_empty_pod() -> Result<(), super::Error> {
        let requests = get_requests(&PodSpec::default())?;
        assert!(requests.is_zero());
        Ok(())
    }

    #[test]
    fn should_fail_on_bad_request_quantity() {
        let pod_spec = PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                resources: Some(ResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "cpu".to_string(),
                        Quantity("lots".to_string()),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        };

        assert_eq!(
            get_requests(&pod_spec),
            Err(Error::InvalidQuantity("cpu".to_string(), "lots".to_string()))
        );
    }

    #[test]
    fn should_get_first_owner_uid() {
        let p = pod("web-0", "100m", "10Mi");
        assert_eq!(owner_uid(&p), None);

        let p = p.with_owner("uid-1").with_owner("uid-2");
        assert_eq!(owner_uid(&p), Some("uid-1"));
    }
}
