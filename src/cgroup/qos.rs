use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::Error;

/// Kubernetes Quality of Service class of a pod.
///
/// The class decides where kubelet places the pod in the cgroup hierarchy:
/// guaranteed pods sit directly below `kubepods`, the other two classes get a
/// dedicated intermediate directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PodQosClass {
    Guaranteed,
    Burstable,
    BestEffort,
}

impl PodQosClass {
    /// Returns the directory kubelet inserts below `kubepods` for this class.
    ///
    /// ```
    /// # use podstat::cgroup::PodQosClass;
    /// assert_eq!(PodQosClass::Guaranteed.path_segment(), None);
    /// assert_eq!(PodQosClass::Burstable.path_segment(), Some("burstable"));
    /// ```
    pub fn path_segment(self) -> Option<&'static str> {
        match self {
            PodQosClass::Guaranteed => None,
            PodQosClass::Burstable => Some("burstable"),
            PodQosClass::BestEffort => Some("besteffort"),
        }
    }
}

impl fmt::Display for PodQosClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PodQosClass::Guaranteed => "Guaranteed",
            PodQosClass::Burstable => "Burstable",
            PodQosClass::BestEffort => "BestEffort",
        };
        f.write_str(name)
    }
}

impl FromStr for PodQosClass {
    type Err = Error;

    /// Parses the `status.qosClass` value of a pod, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("guaranteed") {
            Ok(PodQosClass::Guaranteed)
        } else if s.eq_ignore_ascii_case("burstable") {
            Ok(PodQosClass::Burstable)
        } else if s.eq_ignore_ascii_case("besteffort") {
            Ok(PodQosClass::BestEffort)
        } else {
            Err(Error::InvalidQosClass(s.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qos_class() {
        assert_eq!(
            "Guaranteed".parse::<PodQosClass>().unwrap(),
            PodQosClass::Guaranteed
        );
        assert_eq!(
            "burstable".parse::<PodQosClass>().unwrap(),
            PodQosClass::Burstable
        );
        assert_eq!(
            "BESTEFFORT".parse::<PodQosClass>().unwrap(),
            PodQosClass::BestEffort
        );
    }

    #[test]
    fn test_parse_invalid_qos_class() {
        let err = "Premium".parse::<PodQosClass>().unwrap_err();
        assert!(matches!(err, Error::InvalidQosClass(s) if s == "Premium"));
    }

    #[test]
    fn test_display_round_trips() {
        for qos in [
            PodQosClass::Guaranteed,
            PodQosClass::Burstable,
            PodQosClass::BestEffort,
        ] {
            assert_eq!(qos.to_string().parse::<PodQosClass>().unwrap(), qos);
        }
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(PodQosClass::Guaranteed.path_segment(), None);
        assert_eq!(PodQosClass::Burstable.path_segment(), Some("burstable"));
        assert_eq!(PodQosClass::BestEffort.path_segment(), Some("besteffort"));
    }
}
