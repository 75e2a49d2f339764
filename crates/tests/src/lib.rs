#[cfg(test)]
mod common;

#[cfg(test)]
mod report_precheck_tests;


#[cfg(test)]
mod report_status_tests;

#[cfg(test)]
mod report_get_tests;
