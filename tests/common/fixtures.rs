//! Standard test fixtures with realistic MIB data.

use std::sync::Arc;

use snmp_stack::agent::{MibTree, NodeKind};
use snmp_stack::handler::ScalarHandler;
use snmp_stack::{AsnValue, Oid, oid};

use super::handler::TestHandler;

/// Number of rows in the fixture interface table.
pub const IF_COUNT: u64 = 3;

pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

/// sysDescr object (without the `.0` instance arc).
pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1)
}

pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3)
}

pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5)
}

/// ifDescr column.
pub fn if_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 2, 1, 2)
}

fn scalar(mib: &mut MibTree, object: Oid, value: impl Into<AsnValue>) {
    mib.leaf(object.clone(), 1, Arc::new(ScalarHandler::new(object, value)))
        .expect("register scalar");
}

/// Two system scalars: sysDescr.0 and sysUpTime.0.
pub fn minimal_mib() -> MibTree {
    let mut mib = MibTree::new();
    mib.insert(system_subtree(), NodeKind::Group, 0, None)
        .expect("register system group");
    scalar(&mut mib, sys_descr(), "Test SNMP Agent");
    scalar(&mut mib, sys_uptime(), AsnValue::timeticks(123456));
    mib
}

/// Register ifTable (ifIndex and ifDescr columns) with `count` rows.
pub fn interfaces_table(mib: &mut MibTree, count: u64) {
    let table = oid!(1, 3, 6, 1, 2, 1, 2, 2);
    let entry = table.child(1);
    mib.insert(table, NodeKind::Table, 0, None)
        .expect("register ifTable");
    mib.insert(entry.clone(), NodeKind::Entry, 1, None)
        .expect("register ifEntry");

    let if_index = entry.child(1);
    let index_column = TestHandler::new(
        (1..=count).map(|i| (if_index.child(i), AsnValue::integer(i as i64))),
    );
    mib.leaf(if_index, 1, Arc::new(index_column))
        .expect("register ifIndex");

    let descr_column = TestHandler::new(
        (1..=count).map(|i| (if_descr().child(i), AsnValue::from(format!("eth{}", i - 1)))),
    );
    mib.leaf(if_descr(), 1, Arc::new(descr_column))
        .expect("register ifDescr");
}

/// Full system group plus the interfaces group.
///
/// - sysDescr.0 .. sysServices.0 (sysName.0 writable)
/// - ifNumber.0
/// - ifIndex.1..3, ifDescr.1..3
pub fn standard_mib() -> MibTree {
    let mut mib = MibTree::new();
    mib.insert(system_subtree(), NodeKind::Group, 0, None)
        .expect("register system group");
    scalar(&mut mib, sys_descr(), "Test SNMP Agent");
    scalar(
        &mut mib,
        oid!(1, 3, 6, 1, 2, 1, 1, 2),
        AsnValue::oid(oid!(1, 3, 6, 1, 4, 1, 99999)),
    );
    scalar(&mut mib, sys_uptime(), AsnValue::timeticks(123456));
    scalar(&mut mib, oid!(1, 3, 6, 1, 2, 1, 1, 4), "admin@test.local");
    mib.leaf(
        sys_name(),
        1,
        Arc::new(ScalarHandler::new(sys_name(), "test-agent").writable()),
    )
    .expect("register sysName");
    scalar(&mut mib, oid!(1, 3, 6, 1, 2, 1, 1, 6), "Test Lab");
    scalar(&mut mib, oid!(1, 3, 6, 1, 2, 1, 1, 7), AsnValue::integer(72));

    mib.insert(oid!(1, 3, 6, 1, 2, 1, 2), NodeKind::Group, 0, None)
        .expect("register interfaces group");
    scalar(
        &mut mib,
        oid!(1, 3, 6, 1, 2, 1, 2, 1),
        AsnValue::integer(IF_COUNT as i64),
    );
    interfaces_table(&mut mib, IF_COUNT);
    mib
}
